use crate::{
    constants::filesys::{
        BOOT_FILES, MAX_DIRECTORIES, MAX_FILENAME, MAX_FILES, MAX_FILE_SIZE, ROOT_NAME,
    },
    filesys::{
        table::SlotTable, DirEntry, DirId, EntryKind, FileId, FilePermissions, FileType, FsError,
    },
    truncated,
};
use alloc::{boxed::Box, vec, vec::Vec};
use arrayvec::ArrayString;

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: ArrayString<MAX_FILENAME>,
    /// Bytes written so far; never exceeds `MAX_FILE_SIZE`.
    pub size: usize,
    pub file_type: FileType,
    pub permissions: FilePermissions,
    /// Start of this file's partition in the data blob.
    pub data_start: usize,
    pub parent: DirId,
    pub next_file: Option<FileId>,
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: ArrayString<MAX_FILENAME>,
    pub parent: DirId,
    pub first_file: Option<FileId>,
    pub first_child: Option<DirId>,
    pub next_sibling: Option<DirId>,
}

pub struct FileSystem {
    files: SlotTable<FileEntry>,
    directories: SlotTable<DirectoryEntry>,
    data: Box<[u8]>,
    current: DirId,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    /// An empty catalog holding only the root directory.
    pub fn new() -> Self {
        let mut fs = Self {
            files: SlotTable::new(MAX_FILES),
            directories: SlotTable::new(MAX_DIRECTORIES),
            data: vec![0u8; MAX_FILES * MAX_FILE_SIZE].into_boxed_slice(),
            current: DirId::ROOT,
        };
        fs.format();
        fs
    }

    /// A fresh catalog with the boot images in the root directory.
    pub fn init() -> Result<Self, FsError> {
        let mut fs = Self::new();
        for name in BOOT_FILES {
            fs.create_file(name, FileType::Regular, FilePermissions::READ_EXECUTE)?;
        }
        log::info!("file system ready, {} boot files", BOOT_FILES.len());
        Ok(fs)
    }

    /// Drops every file and directory and recreates the root.
    pub fn format(&mut self) {
        self.files = SlotTable::new(MAX_FILES);
        self.directories = SlotTable::new(MAX_DIRECTORIES);
        self.data.fill(0);
        self.current = DirId::ROOT;

        let root = self.directories.insert_with(|_| DirectoryEntry {
            name: truncated(ROOT_NAME),
            parent: DirId::ROOT,
            first_file: None,
            first_child: None,
            next_sibling: None,
        });
        if let Err(err) = root {
            log::error!("could not create root directory: {}", err);
        }
    }

    /// Creates a file at the end of the current directory's file list.
    pub fn create_file(
        &mut self,
        name: &str,
        file_type: FileType,
        permissions: FilePermissions,
    ) -> Result<FileId, FsError> {
        let name = valid_name(name)?;
        let parent = self.current;
        self.directories.get(parent.index())?;

        let id = self.files.insert_with(|id| FileEntry {
            name,
            size: 0,
            file_type,
            permissions,
            data_start: id * MAX_FILE_SIZE,
            parent,
            next_file: None,
        })?;
        let id = FileId(id as u32);

        // the partition may hold bytes of a deleted file
        let start = id.index() * MAX_FILE_SIZE;
        self.data[start..start + MAX_FILE_SIZE].fill(0);

        match self.file_chain(parent).last() {
            Some(last) => self.files.get_mut(last.index())?.next_file = Some(id),
            None => self.directories.get_mut(parent.index())?.first_file = Some(id),
        }
        log::debug!("created file {} ({}) in directory {}", id, name, parent);
        Ok(id)
    }

    /// Creates a directory at the end of the current directory's subdirectory list.
    pub fn create_directory(&mut self, name: &str) -> Result<DirId, FsError> {
        let name = valid_name(name)?;
        let parent = self.current;
        self.directories.get(parent.index())?;

        let id = self.directories.insert_with(|_| DirectoryEntry {
            name,
            parent,
            first_file: None,
            first_child: None,
            next_sibling: None,
        })?;
        let id = DirId(id as u32);

        match self.child_chain(parent).last() {
            Some(last) => self.directories.get_mut(last.index())?.next_sibling = Some(id),
            None => self.directories.get_mut(parent.index())?.first_child = Some(id),
        }
        log::debug!("created directory {} ({}) in directory {}", id, name, parent);
        Ok(id)
    }

    pub fn delete_file(&mut self, id: FileId) -> Result<(), FsError> {
        let entry = self.files.get(id.index())?;
        let (parent, next) = (entry.parent, entry.next_file);

        if self.directories.get(parent.index())?.first_file == Some(id) {
            self.directories.get_mut(parent.index())?.first_file = next;
        } else {
            let previous = self
                .file_chain(parent)
                .find(|&file| self.next_file_of(file) == Some(id));
            if let Some(previous) = previous {
                self.files.get_mut(previous.index())?.next_file = next;
            }
        }

        let entry = self.files.remove(id.index())?;
        log::debug!("deleted file {} ({})", id, entry.name);
        Ok(())
    }

    /// Deletes an empty directory. The root cannot be deleted.
    pub fn delete_directory(&mut self, id: DirId) -> Result<(), FsError> {
        if id == DirId::ROOT {
            return Err(FsError::InvalidId);
        }
        let entry = self.directories.get(id.index())?;
        if entry.first_file.is_some() || entry.first_child.is_some() {
            return Err(FsError::NotEmpty);
        }
        let (parent, next) = (entry.parent, entry.next_sibling);

        if self.directories.get(parent.index())?.first_child == Some(id) {
            self.directories.get_mut(parent.index())?.first_child = next;
        } else {
            let previous = self
                .child_chain(parent)
                .find(|&child| self.next_sibling_of(child) == Some(id));
            if let Some(previous) = previous {
                self.directories.get_mut(previous.index())?.next_sibling = next;
            }
        }

        let entry = self.directories.remove(id.index())?;
        if self.current == id {
            self.current = parent;
        }
        log::debug!("deleted directory {} ({})", id, entry.name);
        Ok(())
    }

    /// First file in `dir` with the given name. Names are compared after the
    /// same truncation applied on creation.
    pub fn find_file(&self, name: &str, dir: DirId) -> Result<FileId, FsError> {
        self.directories.get(dir.index())?;
        let name: ArrayString<MAX_FILENAME> = truncated(name);
        self.file_chain(dir)
            .find(|file| {
                self.files
                    .get(file.index())
                    .is_ok_and(|entry| entry.name == name)
            })
            .ok_or(FsError::NotFound)
    }

    pub fn find_directory(&self, name: &str, dir: DirId) -> Result<DirId, FsError> {
        self.directories.get(dir.index())?;
        let name: ArrayString<MAX_FILENAME> = truncated(name);
        self.child_chain(dir)
            .find(|child| {
                self.directories
                    .get(child.index())
                    .is_ok_and(|entry| entry.name == name)
            })
            .ok_or(FsError::NotFound)
    }

    /// Copies file bytes starting at `offset` into `buf`. Returns the number
    /// of bytes copied, which is 0 at or past the end of the file.
    pub fn read_file(&self, id: FileId, buf: &mut [u8], offset: usize) -> Result<usize, FsError> {
        let entry = self.files.get(id.index())?;
        if offset >= entry.size {
            return Ok(0);
        }
        let count = buf.len().min(entry.size - offset);
        let start = entry.data_start + offset;
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        Ok(count)
    }

    /// Writes `data` at `offset`. The whole write must fit in the file's
    /// partition; the file size grows to cover it and never shrinks.
    pub fn write_file(&mut self, id: FileId, data: &[u8], offset: usize) -> Result<usize, FsError> {
        let entry = self.files.get_mut(id.index())?;
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= MAX_FILE_SIZE)
            .ok_or(FsError::CapacityExceeded)?;

        let start = entry.data_start + offset;
        entry.size = entry.size.max(end);
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// The bytes currently stored in a file.
    pub fn contents(&self, id: FileId) -> Result<&[u8], FsError> {
        let entry = self.files.get(id.index())?;
        Ok(&self.data[entry.data_start..entry.data_start + entry.size])
    }

    /// Files first, then subdirectories, each in list order.
    pub fn list_directory(&self, dir: DirId) -> Result<Vec<DirEntry>, FsError> {
        self.directories.get(dir.index())?;

        let mut entries = Vec::new();
        for id in self.file_chain(dir) {
            let file = self.files.get(id.index())?;
            entries.push(DirEntry {
                name: file.name,
                kind: EntryKind::File(id),
                size: file.size,
            });
        }
        for id in self.child_chain(dir) {
            let child = self.directories.get(id.index())?;
            entries.push(DirEntry {
                name: child.name,
                kind: EntryKind::Directory(id),
                size: 0,
            });
        }
        Ok(entries)
    }

    pub fn current_directory(&self) -> DirId {
        self.current
    }

    pub fn set_current_directory(&mut self, dir: DirId) -> Result<(), FsError> {
        self.directories.get(dir.index())?;
        self.current = dir;
        Ok(())
    }

    pub fn file(&self, id: FileId) -> Result<&FileEntry, FsError> {
        self.files.get(id.index())
    }

    pub fn directory(&self, id: DirId) -> Result<&DirectoryEntry, FsError> {
        self.directories.get(id.index())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    fn file_chain(&self, dir: DirId) -> impl Iterator<Item = FileId> + '_ {
        let first = self
            .directories
            .get(dir.index())
            .ok()
            .and_then(|entry| entry.first_file);
        core::iter::successors(first, move |&id| self.next_file_of(id))
    }

    fn child_chain(&self, dir: DirId) -> impl Iterator<Item = DirId> + '_ {
        let first = self
            .directories
            .get(dir.index())
            .ok()
            .and_then(|entry| entry.first_child);
        core::iter::successors(first, move |&id| self.next_sibling_of(id))
    }

    fn next_file_of(&self, id: FileId) -> Option<FileId> {
        self.files.get(id.index()).ok()?.next_file
    }

    fn next_sibling_of(&self, id: DirId) -> Option<DirId> {
        self.directories.get(id.index()).ok()?.next_sibling
    }
}

fn valid_name(name: &str) -> Result<ArrayString<MAX_FILENAME>, FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidName);
    }
    Ok(truncated(name))
}
