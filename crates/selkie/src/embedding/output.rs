use super::Embedding;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// One entity as seen by renderers and serializers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub label: String,
    pub display_label: String,
    pub position: Vec<f64>,
    pub is_reference: bool,
    pub included: bool,
}

impl Embedding {
    /// Committed positions in slot order, hidden entities included.
    pub fn placements(&self) -> Vec<Placement> {
        let reference = self.reference_slot();
        self.entities()
            .map(|entity| Placement {
                label: entity.label().to_string(),
                display_label: entity.display_label().to_string(),
                position: entity.position().to_vec(),
                is_reference: Some(entity.slot()) == reference,
                included: entity.is_included(),
            })
            .collect()
    }

    /// Writes `label<TAB>x<TAB>y[<TAB>...]` for every visible entity in slot order.
    pub fn write_tsv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for entity in self.entities().filter(|e| e.is_included()) {
            write!(out, "{}", entity.label())?;
            for value in entity.position().as_slice() {
                write!(out, "\t{value}")?;
            }
            writeln!(out)?;
        }
        out.flush()
    }

    pub fn save_tsv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(io_err)?;
        self.write_tsv(std::io::BufWriter::new(file)).map_err(io_err)?;
        tracing::info!(path = %path.display(), entities = self.len(), "saved layout");
        Ok(())
    }
}

impl fmt::Display for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entity in self.entities() {
            write!(f, "Name: {}", entity.label())?;
            for (dim, value) in entity.position().as_slice().iter().enumerate() {
                write!(f, " Dim {dim}: {value:.2}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
