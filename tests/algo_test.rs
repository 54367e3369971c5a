use rankflow::{load_links, rank_links, EngineState, RankflowConfig, RankflowError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_rank_from_files() {
    // Star: center 1 links to leaves, leaves link back, 5 is dangling
    let links_file = write_temp(r#"{"1": [2, 3, 4], "2": [1], "3": [1], "4": [1, 5]}"#);
    let config_file = write_temp("damping_factor: 0.85\nmax_iterations: 200\nshards: 3\n");

    let links = load_links(links_file.path()).unwrap();
    let config = RankflowConfig::from_yaml_file(config_file.path()).unwrap();
    let outcome = rank_links(&links, &config).unwrap();

    assert_eq!(outcome.state, EngineState::Converged);
    assert_eq!(outcome.ranks.len(), 5);
    assert!((outcome.ranks.total() - 5.0).abs() < 1e-9);

    // Center should have the highest rank
    let top = outcome.top_n(1);
    assert_eq!(top[0].0, 1);
}

#[test]
fn test_fixed_iterations_from_yaml() {
    let config = RankflowConfig::from_yaml_str("tolerance: ~\nmax_iterations: 3\n").unwrap();
    let links = rankflow::Links::from_edges([(1, 2), (2, 1)]);

    let outcome = rank_links(&links, &config).unwrap();
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.state, EngineState::Stopped);
}

#[test]
fn test_missing_files() {
    let result = load_links("/nonexistent/links.json");
    assert!(matches!(result, Err(RankflowError::Io(_))));

    let result = RankflowConfig::from_yaml_file("/nonexistent/rankflow.yaml");
    assert!(matches!(result, Err(RankflowError::Io(_))));
}

#[test]
fn test_invalid_config_surfaces_before_ranking() {
    let config = RankflowConfig::from_yaml_str("shards: 0\n").unwrap();
    let links = rankflow::Links::from_edges([(1, 2)]);

    let result = rank_links(&links, &config);
    assert!(matches!(result, Err(RankflowError::Rank(_))));
}
