//! Channel category bucketing
//!
//! Teams are grouped into fixed-size blocks of consecutive ids for display in
//! the chat platform: with a block size of 3, teams 1-3 share one category,
//! 4-6 the next, and so on.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::entity::TeamId;

pub const DEFAULT_BUCKET_SIZE: u32 = 3;

/// Where a team's channels belong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketPlacement {
    /// No live team shares this block; a new category is needed
    NewBucket { first: TeamId, last: TeamId },
    /// Reuse the category of `anchor`, the highest live team id below in the block
    Existing { anchor: TeamId },
}

impl BucketPlacement {
    pub fn needs_new_bucket(&self) -> bool {
        matches!(self, Self::NewBucket { .. })
    }

    /// The team whose category is reused, if any
    pub fn anchor(&self) -> Option<TeamId> {
        match self {
            Self::Existing { anchor } => Some(*anchor),
            Self::NewBucket { .. } => None,
        }
    }

    /// Category label for a new bucket, e.g. `Teams 4-6`
    pub fn label(&self) -> Option<String> {
        match self {
            Self::NewBucket { first, last } => Some(format!("Teams {}-{}", first, last)),
            Self::Existing { .. } => None,
        }
    }
}

/// The block of ids containing `team_id`. A zero `bucket_size` is treated as 1.
pub fn bucket_range(team_id: TeamId, bucket_size: u32) -> RangeInclusive<i64> {
    let size = i64::from(bucket_size.max(1));
    let first = (team_id.value() - 1).div_euclid(size) * size + 1;
    first..=first + size - 1
}

/// Decide where `team_id` goes given the ids of all existing teams.
///
/// Pure in its inputs: `existing` may or may not contain `team_id` itself.
pub fn place_in_bucket(team_id: TeamId, existing: &[TeamId], bucket_size: u32) -> BucketPlacement {
    let range = bucket_range(team_id, bucket_size);
    let (first, last) = (*range.start(), *range.end());

    let anchor = existing
        .iter()
        .copied()
        .filter(|id| id.value() >= first && *id < team_id)
        .max();

    match anchor {
        Some(anchor) => BucketPlacement::Existing { anchor },
        None => BucketPlacement::NewBucket {
            first: TeamId::new(first),
            last: TeamId::new(last),
        },
    }
}
