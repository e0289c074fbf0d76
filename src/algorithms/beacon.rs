/// 固定参考信标定义和信标表

use crate::error::RegistryError;
use std::collections::HashMap;

/// 单个固定信标，加载后不可变
#[derive(Clone, Debug, PartialEq)]
pub struct Beacon {
    /// 信标唯一标识（广播名称）
    pub id: String,
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
}

impl Beacon {
    /// 创建新的信标
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Beacon { id: id.into(), x, y }
    }

    /// 获取信标的 2D 坐标
    pub fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// 到任意点的欧几里得距离
    pub fn distance_to_point(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// 计算与另一信标的欧几里得距离
    pub fn distance_to(&self, other: &Beacon) -> f64 {
        self.distance_to_point(other.x, other.y)
    }
}

/// 已知信标集合 - 以 ID 为键，ID 不允许重复
#[derive(Clone, Debug, Default)]
pub struct BeaconSet {
    beacons: HashMap<String, Beacon>,
}

impl BeaconSet {
    /// 创建空的信标集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 从信标向量创建集合，遇到重复 ID 时报错
    pub fn from_vec(beacons: Vec<Beacon>) -> Result<Self, RegistryError> {
        let mut set = BeaconSet::new();
        for (idx, beacon) in beacons.into_iter().enumerate() {
            set.add_beacon(beacon)
                .map_err(|id| RegistryError::DuplicateId { line: idx + 1, id })?;
        }
        Ok(set)
    }

    /// 添加信标；ID 已存在时返回该 ID 且不覆盖原有信标
    pub fn add_beacon(&mut self, beacon: Beacon) -> Result<(), String> {
        if self.beacons.contains_key(&beacon.id) {
            return Err(beacon.id);
        }
        self.beacons.insert(beacon.id.clone(), beacon);
        Ok(())
    }

    /// 获取信标
    pub fn get(&self, id: &str) -> Option<&Beacon> {
        self.beacons.get(id)
    }

    /// 是否为已知信标
    pub fn contains(&self, id: &str) -> bool {
        self.beacons.contains_key(id)
    }

    /// 获取信标数量
    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }

    /// 迭代信标 ID 和信标
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Beacon)> {
        self.beacons.iter()
    }
}
