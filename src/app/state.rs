use std::io::{self, BufRead, Write};
use std::path::Path;

use super::{Config, ControlCard, Verb, ZapError};
use crate::buffer::{AccessMode, BufferError, TargetManager};
use crate::encoding;
use crate::ui::HexDump;

/// `dump` の長さ省略時のバイト数
const DEFAULT_DUMP_LEN: u64 = 512;
/// `dump` のスキップ省略時のオフセット
const DEFAULT_SKIP: u64 = 0;
/// `dump` 一枚で読み込む最大バイト数
const MAX_DUMP_LEN: u64 = 0x10000;

/// パッチセッション
///
/// コントロールカードを読み込んでターゲットに適用し、
/// 各カードとその結果を `out` に書き出す。
pub struct Session<W: Write> {
    /// 診断ダンプを出力する
    debug: bool,
    /// 書き込み許可フラグ（verify失敗で false、reset で true）
    write_enabled: bool,
    /// 現在のターゲット
    targets: TargetManager,
    /// トランスクリプト出力先
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(config: Config, out: W) -> Self {
        Self {
            debug: config.debug,
            write_enabled: config.write_enabled,
            targets: TargetManager::new(),
            out,
        }
    }

    /// 入力の終わりまでカードを処理し、ターゲットを閉じる
    /// 致命的なカードがあればそのエラーで中断する
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<(), ZapError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.process_card(line.trim_end_matches(['\n', '\r']))?;
        }
        self.finish()
    }

    /// カードをエコーして実行
    pub fn process_card(&mut self, line: &str) -> Result<(), ZapError> {
        writeln!(self.out, "> {}", line)?;

        let card = ControlCard::parse(line);
        match card.verb {
            Verb::Name => self.name(&card),
            Verb::Verify => self.verify(&card),
            Verb::Replace => self.replace(&card),
            Verb::Dump => self.dump(&card),
            Verb::Reset => self.reset(),
            Verb::Comment => {
                if !line.trim().is_empty() {
                    writeln!(self.out, "--> (the above assumed to be a comment)")?;
                }
                Ok(())
            }
        }
    }

    /// 入力終了時の後処理
    pub fn finish(&mut self) -> Result<(), ZapError> {
        writeln!(self.out, "*** end of control cards ***")?;
        if let Some(path) = self.targets.close() {
            if self.debug {
                writeln!(self.out, "--> closing {}", path.display())?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// 書き込みが許可されているか
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// 開いているターゲットのパス
    pub fn target_path(&self) -> Option<&Path> {
        self.targets.path()
    }

    /// トランスクリプト出力先を取得
    pub fn output(&self) -> &W {
        &self.out
    }

    // === 動詞 ===

    fn name(&mut self, card: &ControlCard<'_>) -> Result<(), ZapError> {
        let Some(path) = card.arg(0) else {
            writeln!(self.out, "<fn> missing")?;
            return Ok(());
        };

        self.close_target()?;
        // 失敗は致命的。メッセージは呼び出し側が出力する
        self.targets.open(path, AccessMode::ReadWrite)?;
        Ok(())
    }

    fn verify(&mut self, card: &ControlCard<'_>) -> Result<(), ZapError> {
        let (offset, expected) = self.operands(card)?;

        let actual = match self
            .targets
            .current_mut()
            .and_then(|t| t.read_at(offset, expected.len() as u64))
        {
            Ok(actual) => actual,
            Err(e) => {
                log::warn!("verify at {:#x} failed: {}", offset, e);
                writeln!(self.out, "verify failed: {}; no writes will be performed", e)?;
                self.write_enabled = false;
                return Ok(());
            }
        };

        if actual == expected {
            writeln!(self.out, "'data' compares")?;
            if self.debug {
                self.hex_dump("--> hexDump of data in ver", &expected, offset)?;
            }
        } else {
            log::warn!("verify mismatch at {:#x}; writes disabled", offset);
            writeln!(self.out, "'data' discompares; no writes will be performed")?;
            self.hex_dump("--> hexDump of data in ver", &expected, offset)?;
            self.hex_dump("--> hexDump of data in named file", &actual, offset)?;
            self.write_enabled = false;
        }
        Ok(())
    }

    fn replace(&mut self, card: &ControlCard<'_>) -> Result<(), ZapError> {
        let (offset, payload) = self.operands(card)?;
        if self.debug {
            self.hex_dump("--> hexDump of data: ", &payload, offset)?;
        }

        let target = match self.targets.current_mut() {
            Ok(target) => target,
            Err(e) => {
                writeln!(self.out, "{}; write will NOT be done", e)?;
                return Ok(());
            }
        };

        if !self.write_enabled {
            writeln!(self.out, "write will NOT be done")?;
            return Ok(());
        }
        if target.mode() == AccessMode::ReadOnly {
            let e = BufferError::ReadOnly(target.path().to_path_buf());
            writeln!(self.out, "{}; write will NOT be done", e)?;
            return Ok(());
        }

        writeln!(self.out, "write will be done")?;
        match target.write_at(offset, &payload) {
            Ok(()) => log::info!(
                "wrote {} bytes at {:#x} in {}",
                payload.len(),
                offset,
                target.path().display()
            ),
            Err(e) => {
                log::error!("write at {:#x} failed: {}", offset, e);
                writeln!(self.out, "write failed: {}", e)?;
            }
        }
        Ok(())
    }

    fn dump(&mut self, card: &ControlCard<'_>) -> Result<(), ZapError> {
        let Some(path) = card.arg(0) else {
            writeln!(self.out, "<fn> missing")?;
            return Ok(());
        };

        self.close_target()?;
        if let Err(e) = self.targets.open(path, AccessMode::ReadOnly) {
            log::warn!("dump skipped: {}", e);
            match &e {
                BufferError::Open { source, .. } => writeln!(self.out, "open: {}", source)?,
                other => writeln!(self.out, "open: {}", other)?,
            }
            writeln!(self.out, "(filename={})", path)?;
            return Ok(());
        }

        let len = match card.arg(1) {
            Some(token) => {
                let len = self.hex_number(token, "length")?;
                if self.debug {
                    writeln!(self.out, "--> length is specified and equals {}", len)?;
                }
                if len > MAX_DUMP_LEN {
                    log::warn!("dump length {:#x} clamped to {:#x}", len, MAX_DUMP_LEN);
                    writeln!(
                        self.out,
                        "--> length {:x} exceeds maximum; dumping {:x} bytes",
                        len, MAX_DUMP_LEN
                    )?;
                    MAX_DUMP_LEN
                } else {
                    len
                }
            }
            None => {
                if self.debug {
                    writeln!(self.out, "--> length missing; default to {}", DEFAULT_DUMP_LEN)?;
                }
                DEFAULT_DUMP_LEN
            }
        };

        let skip = match card.arg(2) {
            Some(token) => {
                let skip = self.hex_number(token, "skip")?;
                if self.debug {
                    writeln!(self.out, "--> skip is specified and equals {}", skip)?;
                }
                skip
            }
            None => {
                if self.debug {
                    writeln!(self.out, "--> skip missing; default to {}", DEFAULT_SKIP)?;
                }
                DEFAULT_SKIP
            }
        };

        match self.targets.current_mut().and_then(|t| t.read_at(skip, len)) {
            Ok(data) => self.hex_dump("dump", &data, skip)?,
            Err(e) => writeln!(self.out, "dump failed: {}", e)?,
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ZapError> {
        self.write_enabled = true;
        log::info!("writes enabled");
        if self.debug {
            writeln!(self.out, "--> writes enabled")?;
        }
        Ok(())
    }

    // === ヘルパー ===

    /// `ver`/`rep` のオフセットとデータ
    /// トークンがなければオフセット0、空データで続行。不正なデータは致命的
    fn operands(&mut self, card: &ControlCard<'_>) -> Result<(u64, Vec<u8>), ZapError> {
        let offset = match card.arg(0) {
            Some(token) => self.hex_number(token, "offset")?,
            None => {
                writeln!(self.out, "missing offset")?;
                0
            }
        };
        if self.debug {
            writeln!(self.out, "--> offset in hex: {:x}", offset)?;
        }

        let payload = match card.arg(1) {
            Some(token) => match encoding::parse_payload(token) {
                Ok(payload) => payload,
                Err(e) => {
                    log::debug!("bad data {:?}", token);
                    writeln!(self.out, "{}; exiting", e)?;
                    self.hex_dump("srcP: ", encoding::strip_hex_prefix(token).as_bytes(), 0)?;
                    return Err(e.into());
                }
            },
            None => {
                writeln!(self.out, "missing data")?;
                Vec::new()
            }
        };
        if self.debug {
            writeln!(self.out, "--> datalen in hex = {:x}", payload.len())?;
        }

        Ok((offset, payload))
    }

    /// 16進数を解析。不正な場合は0とし、その旨を出力する
    fn hex_number(&mut self, token: &str, what: &str) -> io::Result<u64> {
        match encoding::try_parse_offset(token) {
            Some(value) => Ok(value),
            None => {
                log::warn!("bad {} {:?}; using 0", what, token);
                writeln!(self.out, "bad {} '{}'; using 0", what, token)?;
                Ok(0)
            }
        }
    }

    /// 現在のターゲットを閉じる
    fn close_target(&mut self) -> io::Result<()> {
        if let Some(path) = self.targets.close() {
            if self.debug {
                writeln!(self.out, "closing {}", path.display())?;
            }
        }
        Ok(())
    }

    /// HEXダンプを出力
    fn hex_dump(&mut self, title: &str, data: &[u8], offset: u64) -> io::Result<()> {
        write!(self.out, "{}", HexDump::new(data).title(title).offset(offset))
    }
}
