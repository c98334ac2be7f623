use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::input::FoldSet;
use crate::model::detection::{FoldDetection, FusedDetection};
use crate::model::geometry::{BBox, weighted_mean_box};
use crate::model::params::EnsembleParams;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsembleStats {
    pub n_images: usize,
    pub total_before: usize,
    pub low_conf_dropped: usize,
    pub n_clusters: usize,
    pub clusters_below_min_folds: usize,
    pub total_after: usize,
}

#[derive(Debug, Clone)]
pub struct Stage1Output {
    /// Fused detections, images in sorted id order.
    pub fused: Vec<FusedDetection>,
    pub stats: EnsembleStats,
}

#[derive(Debug, Clone)]
struct Cluster<'a> {
    members: Vec<&'a FoldDetection>,
    folds: BTreeSet<u32>,
    rep_box: BBox,
}

impl<'a> Cluster<'a> {
    fn seed(det: &'a FoldDetection) -> Self {
        Self {
            members: vec![det],
            folds: BTreeSet::from([det.fold_id]),
            rep_box: det.bbox,
        }
    }

    fn push(&mut self, det: &'a FoldDetection) {
        self.members.push(det);
        self.folds.insert(det.fold_id);
        self.rep_box = member_mean_box(&self.members);
    }
}

fn member_mean_box(members: &[&FoldDetection]) -> BBox {
    weighted_mean_box(members.iter().map(|d| (d.bbox, d.confidence)))
}

pub fn run_stage1(folds: &FoldSet, params: &EnsembleParams) -> Stage1Output {
    let mut stats = EnsembleStats::default();
    let mut fused = Vec::new();

    for (image_id, detections) in &folds.images {
        stats.n_images += 1;
        stats.total_before += detections.len();
        let image = ensemble_image(detections, params);
        stats.low_conf_dropped += image.low_conf_dropped;
        stats.n_clusters += image.n_clusters;
        stats.clusters_below_min_folds += image.clusters_below_min_folds;
        stats.total_after += image.fused.len();
        debug!(
            "image {}: {} boxes -> {} clusters -> {} fused",
            image_id,
            detections.len(),
            image.n_clusters,
            image.fused.len()
        );
        fused.extend(image.fused);
    }

    info!(
        "ensemble done: images={}, boxes_before={}, low_conf_dropped={}, boxes_after={}",
        stats.n_images, stats.total_before, stats.low_conf_dropped, stats.total_after
    );

    Stage1Output { fused, stats }
}

#[derive(Debug, Clone, Default)]
pub struct ImageEnsemble {
    pub fused: Vec<FusedDetection>,
    pub low_conf_dropped: usize,
    pub n_clusters: usize,
    pub clusters_below_min_folds: usize,
}

/// Fuses the detections of a single image. The result depends on the order of
/// `detections` only through confidence ties.
pub fn ensemble_image(detections: &[FoldDetection], params: &EnsembleParams) -> ImageEnsemble {
    let mut joined: Vec<&FoldDetection> = detections
        .iter()
        .filter(|d| d.confidence >= params.min_conf_join)
        .collect();
    let low_conf_dropped = detections.len() - joined.len();
    if joined.is_empty() {
        return ImageEnsemble {
            low_conf_dropped,
            ..ImageEnsemble::default()
        };
    }

    // Stable: equal confidences keep input order.
    joined.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let clusters = build_clusters(&joined, params.iou_threshold);
    let n_clusters = clusters.len();

    let mut fused = Vec::new();
    let mut clusters_below_min_folds = 0usize;
    for cluster in &clusters {
        if cluster.folds.len() < params.min_folds {
            clusters_below_min_folds += 1;
            continue;
        }
        fused.push(fuse_cluster(cluster));
    }

    ImageEnsemble {
        fused,
        low_conf_dropped,
        n_clusters,
        clusters_below_min_folds,
    }
}

fn build_clusters<'a>(ordered: &[&'a FoldDetection], iou_threshold: f64) -> Vec<Cluster<'a>> {
    let mut clusters: Vec<Cluster<'a>> = Vec::new();

    for &det in ordered {
        let mut best: Option<usize> = None;
        let mut best_iou = 0.0f64;
        for (ci, cluster) in clusters.iter().enumerate() {
            let iou = det.bbox.iou(&cluster.rep_box);
            if iou > best_iou && iou >= iou_threshold {
                best_iou = iou;
                best = Some(ci);
            }
        }
        match best {
            Some(ci) => clusters[ci].push(det),
            None => clusters.push(Cluster::seed(det)),
        }
    }

    clusters
}

fn fuse_cluster(cluster: &Cluster<'_>) -> FusedDetection {
    let first = cluster.members[0];
    let confidence = cluster
        .members
        .iter()
        .map(|d| d.confidence)
        .fold(f64::NEG_INFINITY, f64::max);

    FusedDetection {
        image_id: first.image_id.clone(),
        class_id: majority_class(cluster.members.iter().map(|d| d.class_id)),
        confidence,
        bbox: member_mean_box(&cluster.members),
        n_members: cluster.members.len(),
        n_folds: cluster.folds.len(),
    }
}

/// Most frequent class; on equal counts the smallest class id wins.
pub fn majority_class(classes: impl IntoIterator<Item = i64>) -> i64 {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for c in classes {
        *counts.entry(c).or_insert(0) += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for (class_id, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((class_id, count)),
        }
    }
    best.map(|(c, _)| c).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_ensemble.rs"]
mod tests;
