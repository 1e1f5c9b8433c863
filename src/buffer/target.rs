use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::BufferError;

/// オープンモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// `dump` で開いたターゲット
    ReadOnly,
    /// `name` で開いたターゲット
    ReadWrite,
}

/// 開いているファイル（またはブロックデバイス）
#[derive(Debug)]
pub struct TargetHandle {
    /// ファイルパス
    path: PathBuf,
    /// オープンモード
    mode: AccessMode,
    file: File,
}

impl TargetHandle {
    /// ファイルを開く（作成はしない）
    pub fn open(path: impl Into<PathBuf>, mode: AccessMode) -> Result<Self, BufferError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == AccessMode::ReadWrite)
            .open(&path)
            .map_err(|source| BufferError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self { path, mode, file })
    }

    /// 指定位置から最大 `len` バイト読み込む
    /// EOFに達した場合は読めた分だけ返す
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>, BufferError> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut data = Vec::new();
        (&mut self.file).take(len).read_to_end(&mut data)?;
        Ok(data)
    }

    /// 指定位置にバイト列をすべて書き込む
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), BufferError> {
        if self.mode == AccessMode::ReadOnly {
            return Err(BufferError::ReadOnly(self.path.clone()));
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    /// ファイルパスを取得
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// オープンモードを取得
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

/// 同時に一つだけターゲットを保持する
#[derive(Debug, Default)]
pub struct TargetManager {
    current: Option<TargetHandle>,
}

impl TargetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在のターゲットを閉じてから新しいターゲットを開く
    /// 失敗した場合、ターゲットは閉じたままになる
    pub fn open(
        &mut self,
        path: impl Into<PathBuf>,
        mode: AccessMode,
    ) -> Result<&mut TargetHandle, BufferError> {
        self.close();
        let handle = TargetHandle::open(path, mode)?;
        log::debug!("opened {} ({:?})", handle.path().display(), mode);
        Ok(self.current.insert(handle))
    }

    /// 現在のターゲットを閉じる。閉じたパスを返す
    pub fn close(&mut self) -> Option<PathBuf> {
        let handle = self.current.take()?;
        log::debug!("closed {}", handle.path().display());
        Some(handle.path)
    }

    /// 現在のターゲットを取得
    pub fn current_mut(&mut self) -> Result<&mut TargetHandle, BufferError> {
        self.current.as_mut().ok_or(BufferError::NoTarget)
    }

    /// ターゲットのパスを取得
    pub fn path(&self) -> Option<&Path> {
        self.current.as_ref().map(|t| t.path())
    }
}
