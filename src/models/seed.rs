use serde::{Deserialize, Serialize};

use super::Track;
use crate::error::{AppError, AppResult};

/// What the strategies know about one seed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedDescriptor {
    pub id: String,
    pub title: String,
    /// Name of the first listed artist
    pub contributor: String,
    pub genres: Vec<String>,
    pub release_year: Option<i32>,
}

impl SeedDescriptor {
    /// Builds a descriptor from a looked-up track
    ///
    /// Fails when the track lists no artist, since most strategies query by it.
    pub fn from_track(track: Track) -> AppResult<Self> {
        let release_year = track
            .album
            .release_date
            .as_deref()
            .and_then(parse_release_year);

        let primary = track.primary_artist().ok_or_else(|| {
            AppError::ExternalApi(format!("Track {} has no primary artist", track.id))
        })?;
        let contributor = primary.name.clone();
        let genres = primary.genres.clone().unwrap_or_default();

        Ok(Self {
            id: track.id,
            title: track.name,
            contributor,
            genres,
            release_year,
        })
    }
}

fn parse_release_year(date: &str) -> Option<i32> {
    date.split('-').next()?.parse().ok()
}
