use std::{
    collections::HashMap,
    fs,
    io::{self, BufWriter, Write},
    path::Path,
};

use api::v1::Todo;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default, Debug)]
pub struct AppState {
    pub todos: Mutex<HashMap<Uuid, Todo>>,
}

impl AppState {
    /// Load state from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => eyre::bail!(err),
        };
        let data: DataOwned = ron::de::from_reader(file)?;

        match data {
            DataOwned::V1 { todos } => Ok(Self::from_v1(todos)),
        }
    }

    fn from_v1(todos: HashMap<Uuid, Todo>) -> Self {
        Self {
            todos: Mutex::new(todos),
        }
    }

    pub async fn store(&self, path: &Path) -> eyre::Result<()> {
        let todos = self.todos.lock().await;
        let data = DataBorrowed::V1 { todos: &todos };

        replace_file(path, |writer| {
            let mut ron = ron::Serializer::new(writer, Some(Default::default()))?;
            data.serialize(&mut ron)?;
            Ok(())
        })
    }
}

/// Write a sibling temp file and rename it over `path`, so readers see
/// either the old contents or the new ones, never a partial write.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut dyn Write) -> eyre::Result<()>,
) -> eyre::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(path)?;

    Ok(())
}

#[derive(Serialize)]
enum DataBorrowed<'a> {
    V1 { todos: &'a HashMap<Uuid, Todo> },
}

#[derive(Deserialize)]
enum DataOwned {
    V1 { todos: HashMap<Uuid, Todo> },
}
