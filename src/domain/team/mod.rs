//! Team domain module
//!
//! Teams are named groups of verified participants. Membership is stored on
//! the identity (`VerifiedIdentity::team_id`); a team's size is the number of
//! identities pointing at it.

mod bucket;
mod entity;
mod error;
mod repository;
mod validation;

pub use bucket::{bucket_range, place_in_bucket, BucketPlacement, DEFAULT_BUCKET_SIZE};
pub use entity::{ChannelBundle, Team, TeamId};
pub use error::TeamError;
pub use repository::TeamRepository;
pub use validation::{validate_team_name, TeamValidationError, DEFAULT_MAX_TEAM_NAME_LENGTH};
