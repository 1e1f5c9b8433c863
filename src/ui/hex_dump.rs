use std::fmt;

/// 1行あたりのバイト数
const BYTES_PER_ROW: usize = 16;

/// テキスト形式のHEXダンプ
///
/// 各行はオフセット、HEX表示、ASCII表示の順に並ぶ。
/// 最終行が短い場合は空白で埋めてASCII列の位置を揃える。
pub struct HexDump<'a> {
    /// 表示するデータ
    data: &'a [u8],
    /// 見出し
    title: Option<&'a str>,
    /// 先頭バイトのオフセット
    offset: u64,
}

impl<'a> HexDump<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            title: None,
            offset: 0,
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// 表示可能なASCII以外は '.'
    fn ascii(byte: u8) -> char {
        match byte {
            0x20..=0x7E => byte as char,
            _ => '.',
        }
    }

    /// 1行分のデータを描画
    fn render_row(&self, row: usize, chunk: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // u64::MAX 付近では折り返す
        let addr = self.offset.wrapping_add((row * BYTES_PER_ROW) as u64);
        write!(f, "  {:04x} ", addr)?;

        for byte in chunk {
            write!(f, " {:02x}", byte)?;
        }
        for _ in chunk.len()..BYTES_PER_ROW {
            f.write_str("   ")?;
        }

        let text: String = chunk.iter().map(|&b| Self::ascii(b)).collect();
        writeln!(f, "  {}", text)
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = self.title {
            writeln!(f, "{}", title)?;
        }
        for (row, chunk) in self.data.chunks(BYTES_PER_ROW).enumerate() {
            self.render_row(row, chunk, f)?;
        }
        Ok(())
    }
}
