//! Radarr (movie catalog) provider.

use crate::config::InstanceConfig;
use crate::providers::{ArrClient, CandidateKind, SearchCandidate, SearchProvider};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: i64,
    title: String,
    monitored: bool,
    has_file: bool,
    #[serde(default)]
    movie_file: Option<MovieFile>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieFile {
    quality_cutoff_not_met: bool,
}

/// Provider for Radarr-shaped movie backends. The whole collection is fetched
/// in one call and filtered client-side.
pub struct RadarrProvider {
    config: InstanceConfig,
    client: ArrClient,
}

impl RadarrProvider {
    pub fn new(config: InstanceConfig) -> Self {
        let client = ArrClient::new(&config.url, &config.api_key);
        Self { config, client }
    }

    // A movie without a file is classified as missing and never doubles as
    // an upgrade candidate in the same pass.
    fn classify(&self, movie: &RadarrMovie) -> Option<CandidateKind> {
        let mode = self.config.search_mode;
        if mode.includes_missing() && !movie.has_file {
            return Some(CandidateKind::Missing);
        }
        if mode.includes_upgrades()
            && movie.has_file
            && movie
                .movie_file
                .as_ref()
                .is_some_and(|file| file.quality_cutoff_not_met)
        {
            return Some(CandidateKind::Upgrade);
        }
        None
    }
}

impl SearchProvider for RadarrProvider {
    fn get_candidates(&self) -> Result<Vec<SearchCandidate>, String> {
        let movies: Vec<RadarrMovie> = self.client.get_json("/api/v3/movie")?;
        let mut candidates = Vec::new();
        for movie in movies {
            if self.config.monitored_only && !movie.monitored {
                continue;
            }
            if let Some(kind) = self.classify(&movie) {
                candidates.push(SearchCandidate {
                    id: movie.id,
                    title: movie.title,
                    kind,
                });
            }
        }
        Ok(candidates)
    }

    fn search(&self, ids: &[i64]) -> Result<(), String> {
        self.client.post_json(
            "/api/v3/command",
            serde_json::json!({ "name": "MoviesSearch", "movieIds": ids }),
        )
    }
}
