//! JSON input and output for links and rank vectors
//!
//! Links are a JSON object of source id to destination ids:
//! `{"1": [2, 3], "2": [3], "3": []}`

use crate::error::RankflowResult;
use rankflow_algorithms::{Links, RankVector};
use std::path::Path;

pub fn links_from_json(json: &str) -> RankflowResult<Links> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_links(path: impl AsRef<Path>) -> RankflowResult<Links> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let links = links_from_json(&contents)?;
    tracing::info!(
        path = %path.display(),
        sources = links.len(),
        edges = links.edge_count(),
        "loaded links"
    );
    Ok(links)
}

pub fn links_to_json(links: &Links) -> RankflowResult<String> {
    Ok(serde_json::to_string_pretty(links)?)
}

pub fn ranks_to_json(ranks: &RankVector) -> RankflowResult<String> {
    Ok(serde_json::to_string_pretty(ranks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RankflowError;

    #[test]
    fn test_parse_links() {
        let links = links_from_json(r#"{"1": [2, 3, 3], "2": [], "3": [1]}"#).unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links.out_edges(1), &[2, 3, 3]);
        assert!(links.is_dangling_node(2));
        assert_eq!(links.to_nodes().len(), 3);
    }

    #[test]
    fn test_malformed_links() {
        for bad in [r#"[1, 2]"#, r#"{"a": [1]}"#, r#"{"1": [-2]}"#, r#"{"1": 2}"#] {
            let result = links_from_json(bad);
            assert!(matches!(result, Err(RankflowError::Json(_))), "{} parsed", bad);
        }
    }

    #[test]
    fn test_links_survive_json() {
        let links = Links::from_edges([(4, 1), (4, 1), (1, 4)]);
        let json = links_to_json(&links).unwrap();
        assert_eq!(links_from_json(&json).unwrap(), links);
    }

    #[test]
    fn test_ranks_json_uses_string_keys() {
        let ranks: RankVector = [(1, 0.5), (2, 1.5)].into_iter().collect();
        let json = ranks_to_json(&ranks).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["2"], 1.5);
    }
}
