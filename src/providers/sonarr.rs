//! Sonarr (episode catalog) provider.

use crate::config::InstanceConfig;
use crate::providers::{ArrClient, CandidateKind, SearchCandidate, SearchProvider};

const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WantedEpisode {
    id: i64,
    #[serde(default)]
    series: Option<SeriesSummary>,
    season_number: i32,
    episode_number: i32,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct SeriesSummary {
    title: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WantedPage {
    total_records: usize,
    records: Vec<WantedEpisode>,
}

/// Provider for Sonarr-shaped episode backends. Missing and cutoff-unmet
/// episodes come from two independent paginated wanted endpoints, with the
/// monitored filter applied server-side.
pub struct SonarrProvider {
    config: InstanceConfig,
    client: ArrClient,
}

impl SonarrProvider {
    pub fn new(config: InstanceConfig) -> Self {
        let client = ArrClient::new(&config.url, &config.api_key);
        Self { config, client }
    }

    fn fetch_all_pages(&self, endpoint: &str) -> Result<Vec<WantedEpisode>, String> {
        let mut episodes = Vec::new();
        let mut page = 1usize;
        loop {
            let query = format!(
                "{}?includeSeries=true&monitored={}&page={}&pageSize={}&sortKey=airDateUtc&sortDirection=descending",
                endpoint, self.config.monitored_only, page, PAGE_SIZE
            );
            let response: WantedPage = self.client.get_json(&query)?;
            let page_record_count = response.records.len();
            episodes.extend(response.records);

            // Stop on a short page even if totalRecords claims more; the two
            // can disagree while the backend mutates its wanted queue.
            if episodes.len() >= response.total_records || page_record_count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(episodes)
    }

    fn format_episode(episode: &WantedEpisode) -> String {
        let series_title = episode
            .series
            .as_ref()
            .map(|series| series.title.as_str())
            .unwrap_or("Unknown");
        format!(
            "{} - S{:02}E{:02}",
            series_title, episode.season_number, episode.episode_number
        )
    }
}

impl SearchProvider for SonarrProvider {
    fn get_candidates(&self) -> Result<Vec<SearchCandidate>, String> {
        let mut candidates = Vec::new();
        if self.config.search_mode.includes_missing() {
            for episode in self.fetch_all_pages("/api/v3/wanted/missing")? {
                candidates.push(SearchCandidate {
                    id: episode.id,
                    title: Self::format_episode(&episode),
                    kind: CandidateKind::Missing,
                });
            }
        }
        if self.config.search_mode.includes_upgrades() {
            for episode in self.fetch_all_pages("/api/v3/wanted/cutoff")? {
                candidates.push(SearchCandidate {
                    id: episode.id,
                    title: Self::format_episode(&episode),
                    kind: CandidateKind::Upgrade,
                });
            }
        }
        Ok(candidates)
    }

    fn search(&self, ids: &[i64]) -> Result<(), String> {
        self.client.post_json(
            "/api/v3/command",
            serde_json::json!({ "name": "EpisodeSearch", "episodeIds": ids }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SonarrProvider;
    use crate::config::{BackendKind, InstanceConfig, SearchMode};
    use crate::providers::test_http::serve_responses;
    use crate::providers::{CandidateKind, SearchProvider};

    fn test_instance(url: &str) -> InstanceConfig {
        InstanceConfig {
            name: "tv".to_string(),
            kind: BackendKind::Sonarr,
            url: url.to_string(),
            api_key: "secret-key".to_string(),
            search_mode: SearchMode::Both,
            monitored_only: true,
            search_limit: 10,
            rate_limit_per_minute: 60,
            dry_run: false,
            search_frequency_hours: 0.0,
        }
    }

    fn wanted_page(total_records: usize, first_id: i64, record_count: usize) -> String {
        let records: Vec<serde_json::Value> = (0..record_count)
            .map(|offset| {
                serde_json::json!({
                    "id": first_id + offset as i64,
                    "title": "Episode",
                    "series": { "title": "Show" },
                    "seasonNumber": 1,
                    "episodeNumber": offset + 1
                })
            })
            .collect();
        serde_json::json!({
            "page": 1,
            "pageSize": 50,
            "totalRecords": total_records,
            "records": records
        })
        .to_string()
    }

    fn empty_page() -> String {
        wanted_page(0, 0, 0)
    }

    #[test]
    fn test_pagination_fetches_until_total_records() {
        // 51 missing episodes across two pages, then an empty cutoff page.
        let (base_url, requests) = serve_responses(vec![
            (200, wanted_page(51, 1, 50)),
            (200, wanted_page(51, 51, 1)),
            (200, empty_page()),
        ]);
        let provider = SonarrProvider::new(test_instance(&base_url));

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert_eq!(candidates.len(), 51);

        let first = requests.recv().expect("first request");
        let second = requests.recv().expect("second request");
        assert!(first.path.starts_with("/api/v3/wanted/missing?"));
        assert!(first.path.contains("page=1"));
        assert!(first.path.contains("pageSize=50"));
        assert!(first.path.contains("monitored=true"));
        assert!(first.path.contains("includeSeries=true"));
        assert!(second.path.contains("page=2"));
    }

    #[test]
    fn test_short_page_terminates_pagination_despite_total() {
        // totalRecords claims 500 but the first page is short.
        let (base_url, requests) = serve_responses(vec![
            (200, wanted_page(500, 1, 20)),
            (200, empty_page()),
        ]);
        let provider = SonarrProvider::new(test_instance(&base_url));

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert_eq!(candidates.len(), 20);

        let first = requests.recv().expect("first request");
        let second = requests.recv().expect("second request");
        assert!(first.path.starts_with("/api/v3/wanted/missing?"));
        assert!(second.path.starts_with("/api/v3/wanted/cutoff?"));
    }

    #[test]
    fn test_missing_mode_skips_cutoff_endpoint() {
        let (base_url, requests) = serve_responses(vec![(200, wanted_page(1, 1, 1))]);
        let mut instance = test_instance(&base_url);
        instance.search_mode = SearchMode::Missing;
        let provider = SonarrProvider::new(instance);

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, CandidateKind::Missing);

        let request = requests.recv().expect("request should be recorded");
        assert!(request.path.starts_with("/api/v3/wanted/missing?"));
        assert!(requests.try_recv().is_err(), "only one request expected");
    }

    #[test]
    fn test_upgrades_mode_only_fetches_cutoff_endpoint() {
        let (base_url, requests) = serve_responses(vec![(200, wanted_page(1, 7, 1))]);
        let mut instance = test_instance(&base_url);
        instance.search_mode = SearchMode::Upgrades;
        let provider = SonarrProvider::new(instance);

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, 7);
        assert_eq!(candidates[0].kind, CandidateKind::Upgrade);

        let request = requests.recv().expect("request should be recorded");
        assert!(request.path.starts_with("/api/v3/wanted/cutoff?"));
    }

    #[test]
    fn test_monitored_filter_is_passed_through() {
        let (base_url, requests) =
            serve_responses(vec![(200, empty_page()), (200, empty_page())]);
        let mut instance = test_instance(&base_url);
        instance.monitored_only = false;
        let provider = SonarrProvider::new(instance);

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert!(candidates.is_empty());

        let request = requests.recv().expect("request should be recorded");
        assert!(request.path.contains("monitored=false"));
    }

    #[test]
    fn test_episode_title_formatting() {
        let page = serde_json::json!({
            "totalRecords": 2,
            "records": [
                {
                    "id": 1,
                    "title": "Pilot",
                    "series": { "title": "Deep Space" },
                    "seasonNumber": 1,
                    "episodeNumber": 2
                },
                { "id": 2, "title": "Orphan", "seasonNumber": 10, "episodeNumber": 11 }
            ]
        })
        .to_string();
        let (base_url, _requests) = serve_responses(vec![(200, page), (200, empty_page())]);
        let provider = SonarrProvider::new(test_instance(&base_url));

        let candidates = provider.get_candidates().expect("fetch should succeed");
        assert_eq!(candidates[0].title, "Deep Space - S01E02");
        assert_eq!(candidates[1].title, "Unknown - S10E11");
    }

    #[test]
    fn test_search_posts_episode_search_command() {
        let (base_url, requests) = serve_responses(vec![(200, "{}".to_string())]);
        let provider = SonarrProvider::new(test_instance(&base_url));

        provider.search(&[3, 4]).expect("search should succeed");

        let request = requests.recv().expect("request should be recorded");
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/v3/command");
        let body: serde_json::Value =
            serde_json::from_str(&request.body).expect("body should be JSON");
        assert_eq!(
            body,
            serde_json::json!({ "name": "EpisodeSearch", "episodeIds": [3, 4] })
        );
    }
}
