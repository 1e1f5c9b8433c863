//! Control-card language: verbs, card parsing and session errors.

mod state;

pub use state::Session;

use thiserror::Error;

use crate::buffer::BufferError;
use crate::encoding::HexError;

/// 致命的なカードの終了ステータス
pub const EXIT_FATAL: i32 = 4;

/// 起動時の設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// 診断ダンプを出力する
    pub debug: bool,
    /// 書き込み許可の初期値
    pub write_enabled: bool,
}

/// 処理を中断するカードのエラー
#[derive(Debug, Error)]
pub enum ZapError {
    #[error(transparent)]
    BadData(#[from] HexError),

    #[error(transparent)]
    Target(#[from] BufferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZapError {
    /// このエラーに対応する終了ステータス
    pub fn exit_code(&self) -> i32 {
        match self {
            ZapError::BadData(_) | ZapError::Target(_) => EXIT_FATAL,
            ZapError::Io(_) => 1,
        }
    }
}

/// コントロールカードの動詞
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Name,
    Verify,
    Replace,
    Dump,
    Reset,
    Comment,
}

impl Verb {
    /// 先頭トークンから動詞を判定（大文字小文字を区別）
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("name") => Verb::Name,
            Some("ver" | "verify") => Verb::Verify,
            Some("rep") => Verb::Replace,
            Some("dump") => Verb::Dump,
            Some("reset") => Verb::Reset,
            _ => Verb::Comment,
        }
    }
}

/// 解析済みの入力行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCard<'a> {
    pub verb: Verb,
    pub args: Vec<&'a str>,
}

impl<'a> ControlCard<'a> {
    pub fn parse(line: &'a str) -> Self {
        let mut tokens = tokenize(line);
        let verb = Verb::from_token(tokens.next());
        Self {
            verb,
            args: tokens.collect(),
        }
    }

    /// `index` 番目の引数を取得
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }
}

/// 空白・タブ・改行でカードを分割
pub fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split([' ', '\t', '\n', '\r'])
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_collapses_whitespace() {
        let tokens: Vec<_> = tokenize("  ver\t1c2   0x07\n").collect();
        assert_eq!(tokens, vec!["ver", "1c2", "0x07"]);
        assert_eq!(tokenize(" \t\n").count(), 0);
    }

    #[test]
    fn verbs_are_recognized() {
        assert_eq!(ControlCard::parse("name /dev/sdb").verb, Verb::Name);
        assert_eq!(ControlCard::parse("ver 0 00").verb, Verb::Verify);
        assert_eq!(ControlCard::parse("verify 0 00").verb, Verb::Verify);
        assert_eq!(ControlCard::parse("rep 0 00").verb, Verb::Replace);
        assert_eq!(ControlCard::parse("dump x 10 0").verb, Verb::Dump);
        assert_eq!(ControlCard::parse("reset").verb, Verb::Reset);
    }

    #[test]
    fn verbs_are_case_sensitive() {
        assert_eq!(ControlCard::parse("REP 0 00").verb, Verb::Comment);
        assert_eq!(ControlCard::parse("Name foo").verb, Verb::Comment);
    }

    #[test]
    fn unknown_and_blank_lines_are_comments() {
        let card = ControlCard::parse("* nothing to see");
        assert_eq!(card.verb, Verb::Comment);
        assert_eq!(card.args, vec!["nothing", "to", "see"]);

        let card = ControlCard::parse("");
        assert_eq!(card.verb, Verb::Comment);
        assert!(card.args.is_empty());

        assert_eq!(ControlCard::parse("names foo").verb, Verb::Comment);
    }

    #[test]
    fn args_follow_verb() {
        let card = ControlCard::parse("dump /tmp/a.img 200");
        assert_eq!(card.arg(0), Some("/tmp/a.img"));
        assert_eq!(card.arg(1), Some("200"));
        assert_eq!(card.arg(2), None);
    }

    #[test]
    fn fatal_errors_use_distinct_status() {
        let err = ZapError::from(HexError::OddLength(3));
        assert_eq!(err.exit_code(), EXIT_FATAL);

        let err = ZapError::from(std::io::Error::other("closed"));
        assert_eq!(err.exit_code(), 1);
    }
}
