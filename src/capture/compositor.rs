//! Stitches viewport segments into one full-page raster.
//!
//! Merging runs on the blocking pool and reports back with a single
//! [`MergeMessage`], so the capture task never blocks on pixel copies.

use image::RgbaImage;
use image::imageops;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use super::dataurl::DataUrl;
use crate::draw::raster;

/// One viewport capture cropped to the rows it contributes.
#[derive(Debug, Clone)]
pub struct Segment {
    pub image: RgbaImage,
    /// Top row of this segment in the final image, device pixels.
    pub offset_y: u32,
}

impl Segment {
    pub fn new(image: RgbaImage, offset_y: u32) -> Self {
        Self { image, offset_y }
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositeError {
    #[error("no segments to merge")]
    NoSegments,

    #[error("output size {width}x{height} is empty")]
    EmptyOutput { width: u32, height: u32 },

    #[error("segment {index} is {found}px wide, expected {expected}px")]
    WidthMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("segment {index} starts at row {found}, expected row {expected}")]
    Discontinuous {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("segments cover {covered} rows of {total}")]
    IncompleteCoverage { covered: u32, total: u32 },

    #[error("encoding merged image failed: {0}")]
    Encode(String),
}

/// Checks that `segments` tile `width` x `total_height` exactly, top to bottom.
fn validate(segments: &[Segment], width: u32, total_height: u32) -> Result<(), CompositeError> {
    if segments.is_empty() {
        return Err(CompositeError::NoSegments);
    }
    if width == 0 || total_height == 0 {
        return Err(CompositeError::EmptyOutput {
            width,
            height: total_height,
        });
    }

    let mut expected = 0u32;
    for (index, segment) in segments.iter().enumerate() {
        if segment.image.width() != width {
            return Err(CompositeError::WidthMismatch {
                index,
                expected: width,
                found: segment.image.width(),
            });
        }
        if segment.offset_y != expected {
            return Err(CompositeError::Discontinuous {
                index,
                expected,
                found: segment.offset_y,
            });
        }
        expected = expected.saturating_add(segment.height());
    }

    if expected != total_height {
        return Err(CompositeError::IncompleteCoverage {
            covered: expected,
            total: total_height,
        });
    }
    Ok(())
}

/// Draws every segment at its offset onto a fresh `width` x `total_height`
/// canvas. Nothing is allocated unless the segments tile the output exactly.
pub fn composite(
    segments: &[Segment],
    width: u32,
    total_height: u32,
) -> Result<RgbaImage, CompositeError> {
    validate(segments, width, total_height)?;

    let mut canvas = RgbaImage::new(width, total_height);
    for segment in segments {
        imageops::replace(&mut canvas, &segment.image, 0, i64::from(segment.offset_y));
    }
    log::debug!(
        "Composited {} segments into {}x{}",
        segments.len(),
        width,
        total_height
    );
    Ok(canvas)
}

/// Inputs for a background merge.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub segments: Vec<Segment>,
    pub width: u32,
    pub total_height: u32,
}

/// Reply from a background merge, exactly one per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MergeMessage {
    #[serde(rename_all = "camelCase")]
    MergeComplete { data_url: String },
    MergeFailed { error: String },
}

fn run_merge(job: MergeJob) -> Result<String, CompositeError> {
    let merged = composite(&job.segments, job.width, job.total_height)?;
    let png = raster::encode_png(&merged).map_err(|e| CompositeError::Encode(e.to_string()))?;
    Ok(DataUrl::png(png).to_string())
}

/// Runs `job` on the blocking pool and returns the channel its reply arrives on.
pub fn spawn_merge(
    runtime_handle: &tokio::runtime::Handle,
    job: MergeJob,
) -> oneshot::Receiver<MergeMessage> {
    let (reply_tx, reply_rx) = oneshot::channel();
    runtime_handle.spawn_blocking(move || {
        let message = match run_merge(job) {
            Ok(data_url) => MergeMessage::MergeComplete { data_url },
            Err(e) => {
                log::warn!("Merge failed: {}", e);
                MergeMessage::MergeFailed {
                    error: e.to_string(),
                }
            }
        };
        if reply_tx.send(message).is_err() {
            log::debug!("Merge requester went away before the reply");
        }
    });
    reply_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn band(width: u32, height: u32, shade: u8, offset_y: u32) -> Segment {
        Segment::new(
            RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255])),
            offset_y,
        )
    }

    #[test]
    fn stacks_segments_at_their_offsets() {
        let segments = vec![band(4, 10, 10, 0), band(4, 10, 20, 10), band(4, 5, 30, 20)];
        let merged = composite(&segments, 4, 25).unwrap();

        assert_eq!(merged.dimensions(), (4, 25));
        assert_eq!(merged.get_pixel(0, 0)[0], 10);
        assert_eq!(merged.get_pixel(3, 9)[0], 10);
        assert_eq!(merged.get_pixel(0, 10)[0], 20);
        assert_eq!(merged.get_pixel(2, 19)[0], 20);
        assert_eq!(merged.get_pixel(0, 20)[0], 30);
        assert_eq!(merged.get_pixel(3, 24)[0], 30);
    }

    #[test]
    fn rejects_gaps_and_overlaps() {
        let gap = vec![band(4, 10, 1, 0), band(4, 10, 2, 12)];
        assert_eq!(
            composite(&gap, 4, 22).unwrap_err(),
            CompositeError::Discontinuous {
                index: 1,
                expected: 10,
                found: 12
            }
        );

        let overlap = vec![band(4, 10, 1, 0), band(4, 10, 2, 8)];
        assert!(matches!(
            composite(&overlap, 4, 18),
            Err(CompositeError::Discontinuous { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert_eq!(composite(&[], 4, 10).unwrap_err(), CompositeError::NoSegments);
        assert!(matches!(
            composite(&[band(5, 10, 1, 0)], 4, 10),
            Err(CompositeError::WidthMismatch { index: 0, .. })
        ));
        assert_eq!(
            composite(&[band(4, 10, 1, 0)], 4, 12).unwrap_err(),
            CompositeError::IncompleteCoverage {
                covered: 10,
                total: 12
            }
        );
        assert!(matches!(
            composite(&[band(4, 10, 1, 0)], 4, 0),
            Err(CompositeError::EmptyOutput { .. })
        ));
    }

    #[test]
    fn merge_message_wire_format() {
        let json = serde_json::to_string(&MergeMessage::MergeComplete {
            data_url: "data:image/png;base64,AA==".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"action":"mergeComplete","dataUrl":"data:image/png;base64,AA=="}"#
        );
    }

    #[tokio::test]
    async fn background_merge_replies_once() {
        let job = MergeJob {
            segments: vec![band(3, 2, 50, 0), band(3, 2, 60, 2)],
            width: 3,
            total_height: 4,
        };
        let reply = spawn_merge(&tokio::runtime::Handle::current(), job)
            .await
            .unwrap();
        let MergeMessage::MergeComplete { data_url } = reply else {
            panic!("expected completion, got {reply:?}");
        };
        let url: DataUrl = data_url.parse().unwrap();
        let merged = raster::decode(url.data()).unwrap();
        assert_eq!(merged.dimensions(), (3, 4));
        assert_eq!(merged.get_pixel(1, 3)[0], 60);

        let failing = MergeJob {
            segments: vec![],
            width: 3,
            total_height: 4,
        };
        let reply = spawn_merge(&tokio::runtime::Handle::current(), failing)
            .await
            .unwrap();
        assert!(matches!(reply, MergeMessage::MergeFailed { .. }));
    }
}
