use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use oxo_neural::{Network, NetworkRecord};
use rand::RngCore;

/// Where a command writes its JSON result.
#[derive(Debug, Clone)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        output_path.map_or(Output::Stdout, Output::File).write_json(value)
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout => "stdout".to_string(),
            Output::File(path) => path.display().to_string(),
        }
    }

    fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match self {
            Output::Stdout => Box::new(io::stdout().lock()),
            Output::File(path) => Box::new(
                File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?,
            ),
        })
    }

    /// Pretty-prints `value` followed by a newline.
    pub fn write_json<T>(&self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut writer = BufWriter::new(self.writer()?);
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to finish writing {}", self.display_path()))?;
        Ok(())
    }
}

/// Read a serialized network.
///
/// Absent optional fields (fitness, thinking iterations, meta-parameters)
/// are filled in with values drawn from `rng`.
pub fn read_network_file<P>(path: P, rng: &mut dyn RngCore) -> anyhow::Result<Network>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open network file: {}", path.display()))?;
    let record: NetworkRecord = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse network JSON file: {}", path.display()))?;
    record
        .to_network(rng)
        .with_context(|| format!("Invalid network in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use oxo_neural::NetworkConfig;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_network_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let mut network = Network::new(NetworkConfig::default(), &mut rng);
        network.set_fitness(0.75);

        Output::save_json(&network.to_record(), Some(path.clone())).unwrap();
        let loaded = read_network_file(&path, &mut rng).unwrap();
        assert!((loaded.fitness() - 0.75).abs() < f64::EPSILON);
        assert_eq!(loaded.node_count(), network.node_count());
        assert_eq!(loaded.thinking_iterations(), network.thinking_iterations());
    }

    #[test]
    fn test_missing_network_file_names_the_path() {
        let mut rng = Pcg64Mcg::seed_from_u64(12);
        let err = read_network_file("/nonexistent/net.json", &mut rng).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/net.json"));
    }
}
