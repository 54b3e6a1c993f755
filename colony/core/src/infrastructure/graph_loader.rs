// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Graph File Loader
//!
//! Parses the flat-text graph format into a [`ColonyEnvironment`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external text → Domain objects
//!
//! # File Format
//!
//! ```text
//! 4 1 2.0 0.1        <- city_count origin beta [decay]
//! 1 2 3.24           <- one undirected road per line: a b length
//! 1 3 4.65
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Loading is all or
//! nothing: any bad line fails the whole file.

use crate::domain::graph::{CityGraph, CityId, ColonyEnvironment, GraphError, Road};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub struct GraphLoader;

impl GraphLoader {
    /// Parse a graph file from disk
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ColonyEnvironment, GraphError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a graph from its text form
    pub fn parse(input: &str) -> Result<ColonyEnvironment, GraphError> {
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (header_line, header) = lines.next().ok_or(GraphError::MalformedInput {
            line: 1,
            reason: "missing header line".to_string(),
        })?;
        let tokens: Vec<&str> = header.split_whitespace().collect();
        if !(3..=4).contains(&tokens.len()) {
            return Err(malformed(
                header_line,
                format!(
                    "header needs 'city_count origin beta [decay]', found {} tokens",
                    tokens.len()
                ),
            ));
        }

        let city_count: usize = parse_token(header_line, tokens[0], "city count")?;
        if city_count == 0 {
            return Err(GraphError::Empty);
        }
        let origin = CityId(parse_token(header_line, tokens[1], "origin city")?);
        let beta: f64 = parse_token(header_line, tokens[2], "beta")?;
        if !beta.is_finite() || beta < 0.0 {
            return Err(malformed(header_line, format!("beta must be non-negative, got {beta}")));
        }
        let decay = match tokens.get(3) {
            Some(token) => {
                let decay: f64 = parse_token(header_line, token, "decay")?;
                if !(0.0..1.0).contains(&decay) {
                    return Err(malformed(header_line, format!("decay must be in [0, 1), got {decay}")));
                }
                Some(decay)
            }
            None => None,
        };

        let roads = lines
            .map(|(line, text)| parse_road(line, text))
            .collect::<Result<Vec<_>, _>>()?;

        // Cities beyond what the roads can name would be isolated
        let nameable = roads.len().saturating_mul(2).max(1);
        if city_count > nameable {
            return Err(malformed(
                header_line,
                format!(
                    "header declares {city_count} cities but {} roads can reach at most {nameable}",
                    roads.len()
                ),
            ));
        }

        let graph = CityGraph::from_undirected(city_count, roads)?;
        if !graph.contains(origin) {
            return Err(GraphError::CityOutOfRange {
                city: origin,
                city_count,
            });
        }

        tracing::debug!(
            cities = city_count,
            edges = graph.edge_count(),
            origin = %origin,
            beta,
            ?decay,
            "Graph loaded"
        );

        Ok(ColonyEnvironment {
            graph,
            origin,
            beta,
            decay,
        })
    }
}

fn parse_road(line: usize, text: &str) -> Result<Road, GraphError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [source, target, length] = tokens.as_slice() else {
        return Err(malformed(
            line,
            format!("road needs 'source target length', found {} tokens", tokens.len()),
        ));
    };
    Ok(Road::new(
        parse_token(line, source, "source city")?,
        parse_token(line, target, "target city")?,
        parse_token(line, length, "road length")?,
    ))
}

fn parse_token<T: FromStr>(line: usize, token: &str, what: &str) -> Result<T, GraphError> {
    token
        .parse()
        .map_err(|_| malformed(line, format!("{what} {token:?} is not a valid number")))
}

fn malformed(line: usize, reason: String) -> GraphError {
    GraphError::MalformedInput { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SQUARE: &str = "\
4 1 2.0 0.25
1 2 3.0

# diagonal
1 3 4.5
2 3 1.0
3 4 2.0
4 1 6.0
";

    #[test]
    fn test_parse_four_token_header() {
        let env = GraphLoader::parse(SQUARE).unwrap();

        assert_eq!(env.graph.city_count(), 4);
        assert_eq!(env.graph.edge_count(), 10);
        assert_eq!(env.origin, CityId(1));
        assert_eq!(env.beta, 2.0);
        assert_eq!(env.decay, Some(0.25));
        assert_eq!(env.graph.road(3), Some(&Road::new(3, 1, 4.5)));
    }

    #[test]
    fn test_parse_three_token_header() {
        let env = GraphLoader::parse("3 2 1.5\n1 2 1\n2 3 1\n3 1 1\n").unwrap();
        assert_eq!(env.decay, None);
        assert_eq!(env.origin, CityId(2));
    }

    #[test]
    fn test_malformed_lines_report_line_numbers() {
        let cases = [
            ("", 1),
            ("4 1\n", 1),
            ("4 1 2 0.1 9\n", 1),
            ("x 1 2\n", 1),
            ("4 1 2\n1 2 3\n1 two 3\n", 3),
            ("4 1 2\n1 2\n", 2),
            ("4 1 2\n\n\n1 2 3 4\n", 4),
            ("4 1 2 1.5\n", 1),
        ];
        for (input, expected_line) in cases {
            match GraphLoader::parse(input) {
                Err(GraphError::MalformedInput { line, .. }) => {
                    assert_eq!(line, expected_line, "input {input:?}")
                }
                other => panic!("input {input:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_city_range_is_checked() {
        assert!(matches!(
            GraphLoader::parse("3 1 1.0\n1 4 2.0\n2 3 1.0\n"),
            Err(GraphError::CityOutOfRange { city: CityId(4), city_count: 3 })
        ));
        assert!(matches!(
            GraphLoader::parse("3 5 1.0\n1 2 2.0\n2 3 1.0\n"),
            Err(GraphError::CityOutOfRange { city: CityId(5), .. })
        ));
        assert!(matches!(
            GraphLoader::parse("3 1 1.0\n1 2 -2.0\n2 3 1.0\n"),
            Err(GraphError::NonPositiveLength { .. })
        ));
    }

    #[test]
    fn test_city_count_is_bounded_by_roads() {
        match GraphLoader::parse("18446744073709551615 1 2.0\n1 2 1.0\n") {
            Err(GraphError::MalformedInput { line: 1, reason }) => {
                assert!(reason.contains("at most 2"), "{reason}")
            }
            other => panic!("huge city count gave {other:?}"),
        }

        assert!(GraphLoader::parse("5 1 2.0\n1 2 1.0\n3 4 1.0\n").is_err());
        assert!(GraphLoader::parse("4 1 2.0\n1 2 1.0\n3 4 1.0\n").is_ok());
        assert!(GraphLoader::parse("1 1 2.0\n").is_ok());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SQUARE.as_bytes()).unwrap();

        let env = GraphLoader::parse_file(file.path()).unwrap();
        assert_eq!(env.graph.city_count(), 4);

        assert!(matches!(
            GraphLoader::parse_file("/definitely/not/here.txt"),
            Err(GraphError::Io(_))
        ));
    }
}
