use crate::model::geometry::BBox;

/// One detection contributed by one fold for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldDetection {
    pub image_id: String,
    pub class_id: i64,
    pub confidence: f64,
    pub bbox: BBox,
    pub fold_id: u32,
}

/// Result of fusing one surviving cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedDetection {
    pub image_id: String,
    pub class_id: i64,
    pub confidence: f64,
    pub bbox: BBox,
    pub n_members: usize,
    pub n_folds: usize,
}
