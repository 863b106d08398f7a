//! One-JSON-file-per-room storage.
//!
//! Layout under the data directory:
//!
//! ```text
//! <dir>/<room>_board.json   strokes
//! <dir>/<room>_chat.json    chat messages
//! ```
//!
//! Every write goes to its own uniquely named temporary file in the same
//! directory, which is synced and then renamed over the target. A crash
//! mid-write never leaves a truncated document behind, and concurrent
//! writes of one room each publish a complete document.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use easel_core::{Record, RecordKind, RoomId};
use tempfile::NamedTempFile;

use super::{Codec, Storage, StorageError};

/// Storage writing each room document to its own JSON file.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: Arc<PathBuf>,
}

impl FileStorage {
    /// Use `dir` as the data directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self { dir: Arc::new(dir.as_ref().to_path_buf()) })
    }

    /// Data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `room_id` of the given kind.
    pub fn path_for(&self, kind: RecordKind, room_id: &RoomId) -> PathBuf {
        self.dir.join(format!("{room_id}_{kind}.json"))
    }
}

impl Storage for FileStorage {
    fn write_room<R: Record>(&self, room_id: &RoomId, records: &[R]) -> Result<(), StorageError> {
        let bytes = Codec::Json.encode(records)?;
        let path = self.path_for(R::KIND, room_id);

        let mut tmp = NamedTempFile::new_in(self.dir.as_path())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_room<R: Record>(&self, room_id: &RoomId) -> Result<Option<Vec<R>>, StorageError> {
        let bytes = match fs::read(self.path_for(R::KIND, room_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Codec::Json.decode(&bytes).map(Some)
    }

    fn list_rooms(&self, kind: RecordKind) -> Result<Vec<RoomId>, StorageError> {
        let suffix = format!("_{kind}.json");
        let mut rooms = Vec::new();

        for entry in fs::read_dir(self.dir.as_path())? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(&suffix) else { continue };
            if let Ok(room) = RoomId::new(stem) {
                rooms.push(room);
            }
        }

        Ok(rooms)
    }
}
