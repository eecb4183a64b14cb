use crate::math::Vec3;

/// Axis-aligned bounding box in world meters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    /// Tight bounds over `points`; `None` when empty.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut out = Aabb3::new(*first, *first);
        for p in rest {
            out.include(*p);
        }
        Some(out)
    }

    pub fn include(&mut self, p: Vec3) {
        self.min = Vec3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vec3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        let mut out = *self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    pub fn translated(&self, offset: Vec3) -> Aabb3 {
        Aabb3::new(self.min + offset, self.max + offset)
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}
