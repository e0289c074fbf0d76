/// 多边定位求解器
///
/// 求使下式最小的 (x, y)：
///
///   f(p) = Σ (‖p − b_i‖ − d_i)²
///
/// 残差对未知量非线性，没有闭式解，使用 L-BFGS + Armijo 回溯线搜索迭代求解。
/// 初始点固定取所选信标坐标的质心。

use crate::algorithms::beacon::Beacon;
use crate::error::SolveError;
use nalgebra::{Matrix2, Vector2};
use std::collections::VecDeque;

/// Armijo 充分下降系数
const ARMIJO_C1: f64 = 1e-4;
/// 单次线搜索最多回溯次数
const MAX_BACKTRACKS: usize = 40;
/// 线搜索失败时，梯度低于此值（相对目标函数）仍视为已收敛
const STALL_GRADIENT: f64 = 1e-6;

/// 到某个已知信标的距离估计（米）
#[derive(Clone, Debug, PartialEq)]
pub struct RangeEstimate {
    pub beacon: Beacon,
    pub distance: f64,
}

impl RangeEstimate {
    pub fn new(beacon: Beacon, distance: f64) -> Self {
        RangeEstimate { beacon, distance }
    }

    fn position(&self) -> Vector2<f64> {
        Vector2::new(self.beacon.x, self.beacon.y)
    }
}

/// 求解器参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverOptions {
    /// 最大迭代次数，耗尽视为失败
    pub max_iterations: usize,
    /// L-BFGS 保存的修正对数量
    pub history: usize,
    /// 梯度无穷范数收敛阈值
    pub gradient_tolerance: f64,
    /// 相对下降量收敛阈值
    pub function_tolerance: f64,
    /// 散布矩阵最小/最大特征值之比低于此值视为几何退化
    pub degeneracy_ratio: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_iterations: 200,
            history: 5,
            gradient_tolerance: 1e-10,
            function_tolerance: 2.2e-9,
            degeneracy_ratio: 1e-9,
        }
    }
}

/// 求解结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solution {
    pub x: f64,
    pub y: f64,
    /// 实际迭代次数
    pub iterations: usize,
    /// 距离残差均方根（米）
    pub residual_rms: f64,
}

/// 非线性最小二乘多边定位
#[derive(Clone, Debug, Default)]
pub struct MultilaterationSolver {
    options: SolverOptions,
}

impl MultilaterationSolver {
    pub fn new(options: SolverOptions) -> Self {
        MultilaterationSolver { options }
    }

    /// 目标函数：距离残差平方和
    fn objective_at(ranges: &[RangeEstimate], p: &Vector2<f64>) -> f64 {
        ranges
            .iter()
            .map(|r| {
                let residual = (p - r.position()).norm() - r.distance;
                residual * residual
            })
            .sum()
    }

    fn gradient_at(ranges: &[RangeEstimate], p: &Vector2<f64>) -> Vector2<f64> {
        let mut g = Vector2::zeros();
        for r in ranges {
            let delta = p - r.position();
            let dist = delta.norm();
            // 与信标重合处不可导，取零作为次梯度
            if dist > 1e-12 {
                g += delta * (2.0 * (dist - r.distance) / dist);
            }
        }
        g
    }

    /// 所选信标坐标的质心
    pub fn initial_guess(ranges: &[RangeEstimate]) -> (f64, f64) {
        let n = ranges.len().max(1) as f64;
        let sum = ranges
            .iter()
            .fold(Vector2::zeros(), |acc: Vector2<f64>, r| acc + r.position());
        (sum.x / n, sum.y / n)
    }

    /// 检查信标几何：全部共线或重合时无法定位
    fn check_geometry(&self, ranges: &[RangeEstimate]) -> Result<(), SolveError> {
        let (cx, cy) = Self::initial_guess(ranges);
        let centroid = Vector2::new(cx, cy);

        let scatter = ranges.iter().fold(Matrix2::zeros(), |acc: Matrix2<f64>, r| {
            let d = r.position() - centroid;
            acc + d * d.transpose()
        });

        let eigenvalues = scatter.symmetric_eigenvalues();
        let largest = eigenvalues.max();
        let smallest = eigenvalues.min();

        if largest <= f64::EPSILON || smallest / largest < self.options.degeneracy_ratio {
            return Err(SolveError::DegenerateGeometry);
        }
        Ok(())
    }

    /// 从质心出发求解
    pub fn solve(&self, ranges: &[RangeEstimate]) -> Result<Solution, SolveError> {
        let start = Self::initial_guess(ranges);
        self.solve_from(ranges, start)
    }

    /// 从指定初始点求解
    pub fn solve_from(&self, ranges: &[RangeEstimate], start: (f64, f64)) -> Result<Solution, SolveError> {
        if ranges.len() < 3 {
            return Err(SolveError::TooFewRanges(ranges.len()));
        }
        if ranges.iter().any(|r| !r.distance.is_finite()) {
            return Err(SolveError::NonFinite);
        }
        self.check_geometry(ranges)?;

        let opts = &self.options;
        let mut p = Vector2::new(start.0, start.1);
        let mut f = Self::objective_at(ranges, &p);
        if !f.is_finite() {
            return Err(SolveError::NonFinite);
        }
        let mut g = Self::gradient_at(ranges, &p);
        let mut history: VecDeque<(Vector2<f64>, Vector2<f64>, f64)> = VecDeque::with_capacity(opts.history);

        for iteration in 1..=opts.max_iterations {
            if g.amax() <= opts.gradient_tolerance {
                return Ok(Self::solution(ranges, &p, f, iteration - 1));
            }

            let mut direction = -Self::two_loop(&g, &history);
            if direction.dot(&g) >= 0.0 {
                history.clear();
                direction = -g;
            }

            // 没有曲率信息时把首步长限制为单位长度
            let mut step = if history.is_empty() {
                (1.0 / direction.norm()).min(1.0)
            } else {
                1.0
            };
            let slope = g.dot(&direction);

            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = p + direction * step;
                let fc = Self::objective_at(ranges, &candidate);
                if fc.is_finite() && fc <= f + ARMIJO_C1 * step * slope {
                    accepted = Some((candidate, fc));
                    break;
                }
                step *= 0.5;
            }
            let Some((p_next, f_next)) = accepted else {
                // 舍入误差下已无法继续下降
                if g.amax() <= STALL_GRADIENT * f.max(1.0) {
                    return Ok(Self::solution(ranges, &p, f, iteration));
                }
                return Err(SolveError::LineSearch(iteration));
            };
            let g_next = Self::gradient_at(ranges, &p_next);

            let s = p_next - p;
            let y = g_next - g;
            let sy = s.dot(&y);
            if opts.history > 0 && sy > f64::EPSILON * y.norm_squared() {
                while history.len() >= opts.history {
                    history.pop_front();
                }
                history.push_back((s, y, 1.0 / sy));
            }

            let reduction = (f - f_next) / f.abs().max(f_next.abs()).max(1.0);
            p = p_next;
            f = f_next;
            g = g_next;

            if reduction <= opts.function_tolerance {
                return Ok(Self::solution(ranges, &p, f, iteration));
            }
        }

        Err(SolveError::MaxIterations(opts.max_iterations))
    }

    /// L-BFGS 双循环递推，返回 H·g
    fn two_loop(g: &Vector2<f64>, history: &VecDeque<(Vector2<f64>, Vector2<f64>, f64)>) -> Vector2<f64> {
        let mut q = *g;
        let mut alphas = Vec::with_capacity(history.len());

        for (s, y, rho) in history.iter().rev() {
            let alpha = rho * s.dot(&q);
            q -= y * alpha;
            alphas.push(alpha);
        }

        if let Some((s, y, _)) = history.back() {
            q *= s.dot(y) / y.norm_squared();
        }

        for ((s, y, rho), alpha) in history.iter().zip(alphas.into_iter().rev()) {
            let beta = rho * y.dot(&q);
            q += s * (alpha - beta);
        }
        q
    }

    fn solution(ranges: &[RangeEstimate], p: &Vector2<f64>, f: f64, iterations: usize) -> Solution {
        Solution {
            x: p.x,
            y: p.y,
            iterations,
            residual_rms: (f / ranges.len() as f64).sqrt(),
        }
    }
}
