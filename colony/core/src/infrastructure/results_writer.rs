// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Results Writers
//
// Persist the final pheromone table and the best tour of a run.
//
// pheromone_levels.txt   one "source target level" line per directed road,
//                        in edge order
// best_tour.txt          "length <L>" followed by one
//                        "source target length" line per tour edge

use crate::domain::collaborator::{ResultsWriter, WriterError};
use crate::domain::graph::CityGraph;
use crate::domain::pheromone::PheromoneTable;
use crate::domain::tour::Tour;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

pub const PHEROMONE_FILE: &str = "pheromone_levels.txt";
pub const BEST_TOUR_FILE: &str = "best_tour.txt";

pub fn render_pheromone_levels(table: &PheromoneTable, graph: &CityGraph) -> String {
    graph
        .roads()
        .iter()
        .enumerate()
        .map(|(edge, road)| format!("{} {} {}\n", road.source, road.target, table.level(edge)))
        .collect()
}

pub fn render_tour(tour: &Tour, graph: &CityGraph) -> String {
    let mut out = format!("length {}\n", tour.length());
    for road in tour.edges().iter().filter_map(|&edge| graph.road(edge)) {
        out.push_str(&format!("{} {} {}\n", road.source, road.target, road.length));
    }
    out
}

/// Writes result files into a directory, creating it on first use.
pub struct FileResultsWriter {
    output_dir: PathBuf,
}

impl FileResultsWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write_file(&self, name: &str, content: String) -> Result<(), WriterError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| WriterError::Io {
                path: self.output_dir.clone(),
                source,
            })?;

        let path = self.output_dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| WriterError::Io {
                path: path.clone(),
                source,
            })?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ResultsWriter for FileResultsWriter {
    async fn write_pheromone_table(
        &self,
        table: &PheromoneTable,
        graph: &CityGraph,
    ) -> Result<(), WriterError> {
        self.write_file(PHEROMONE_FILE, render_pheromone_levels(table, graph))
            .await
    }

    async fn write_tour(&self, tour: &Tour, graph: &CityGraph) -> Result<(), WriterError> {
        self.write_file(BEST_TOUR_FILE, render_tour(tour, graph)).await
    }
}

/// Keeps rendered results in memory.
#[derive(Default)]
pub struct MemoryResultsWriter {
    pheromone_levels: Mutex<Vec<String>>,
    tours: Mutex<Vec<String>>,
}

impl MemoryResultsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pheromone table written so far, rendered.
    pub async fn pheromone_writes(&self) -> Vec<String> {
        self.pheromone_levels.lock().await.clone()
    }

    pub async fn tour_writes(&self) -> Vec<String> {
        self.tours.lock().await.clone()
    }
}

#[async_trait]
impl ResultsWriter for MemoryResultsWriter {
    async fn write_pheromone_table(
        &self,
        table: &PheromoneTable,
        graph: &CityGraph,
    ) -> Result<(), WriterError> {
        self.pheromone_levels
            .lock()
            .await
            .push(render_pheromone_levels(table, graph));
        Ok(())
    }

    async fn write_tour(&self, tour: &Tour, graph: &CityGraph) -> Result<(), WriterError> {
        self.tours.lock().await.push(render_tour(tour, graph));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Road;

    fn triangle() -> CityGraph {
        CityGraph::from_undirected(
            3,
            vec![Road::new(1, 2, 3.0), Road::new(2, 3, 4.0), Road::new(3, 1, 5.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_render_pheromone_levels() {
        let graph = triangle();
        let table = PheromoneTable::from_levels(vec![0.5, 0.25, 0.0, 1.0, 2.0, 0.125]);

        assert_eq!(
            render_pheromone_levels(&table, &graph),
            "1 2 0.5\n2 1 0.25\n2 3 0\n3 2 1\n3 1 2\n1 3 0.125\n"
        );
    }

    #[test]
    fn test_render_tour() {
        let graph = triangle();
        let tour = Tour::from_edges(&graph, vec![0, 2, 4]).unwrap();

        assert_eq!(render_tour(&tour, &graph), "length 12\n1 2 3\n2 3 4\n3 1 5\n");
    }

    #[tokio::test]
    async fn test_file_writer_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results");
        let writer = FileResultsWriter::new(&output);
        let graph = triangle();

        writer
            .write_pheromone_table(&PheromoneTable::filled(6, 1.5), &graph)
            .await
            .unwrap();
        writer
            .write_tour(&Tour::from_edges(&graph, vec![0, 2, 4]).unwrap(), &graph)
            .await
            .unwrap();

        let levels = std::fs::read_to_string(output.join(PHEROMONE_FILE)).unwrap();
        assert_eq!(levels.lines().count(), 6);
        assert!(levels.lines().all(|line| line.ends_with(" 1.5")));

        let tour = std::fs::read_to_string(output.join(BEST_TOUR_FILE)).unwrap();
        assert!(tour.starts_with("length 12\n"));
    }

    #[tokio::test]
    async fn test_memory_writer_records_writes() {
        let writer = MemoryResultsWriter::new();
        let graph = triangle();

        writer
            .write_pheromone_table(&PheromoneTable::new(6), &graph)
            .await
            .unwrap();

        assert_eq!(writer.pheromone_writes().await.len(), 1);
        assert!(writer.tour_writes().await.is_empty());
    }
}
