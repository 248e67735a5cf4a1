//! 终端命令 - 编排层
//!
//! 选题和编辑试卷两个交互阶段的命令解析，以及读取标准输入的提示器。
//! 解析函数都是纯函数，输入错误时返回给用户看的提示。

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// 选题阶段的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// 按全局编号切换，可一次给多个
    Toggle(Vec<usize>),
    All,
    /// 显示或隐藏答案
    Answers,
    Show,
    /// 回到 Sections 重新生成
    Regenerate,
    Done,
}

pub const SELECTION_HELP: &str =
    "Commands: <n> [n ...] toggle | all | answers | show | regenerate | done";

/// 解析选题命令，编号之间可用空格或逗号分隔
pub fn parse_selection_command(input: &str) -> Result<SelectionCommand, String> {
    let trimmed = input.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "done" | "next" => return Ok(SelectionCommand::Done),
        "all" => return Ok(SelectionCommand::All),
        "answers" | "a" => return Ok(SelectionCommand::Answers),
        "show" | "s" => return Ok(SelectionCommand::Show),
        "regenerate" | "back" => return Ok(SelectionCommand::Regenerate),
        _ => {}
    }

    let numbers = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Unknown command: {}. {}", part, SELECTION_HELP))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SelectionCommand::Toggle(numbers))
}

/// 编辑试卷阶段的命令，块编号从 1 开始
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    /// 替换某个块的文字
    Edit(usize, String),
    /// 在某个块之前插入一段文字
    Insert(usize, String),
    Remove(usize),
    Show,
    /// 回到选题
    Back,
    Export,
}

pub const SURFACE_HELP: &str =
    "Commands: edit <n> <text> | insert <n> <text> | remove <n> | show | back | export";

/// 解析编辑命令
pub fn parse_surface_command(input: &str) -> Result<SurfaceCommand, String> {
    let trimmed = input.trim();
    let (verb, rest) = trimmed
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim_start()))
        .unwrap_or((trimmed, ""));

    let block_number = |rest: &str| -> Result<(usize, String), String> {
        let (number, text) = rest
            .split_once(char::is_whitespace)
            .map(|(n, t)| (n, t.trim_start()))
            .unwrap_or((rest, ""));
        let number = number
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("Expected a block number, got {:?}. {}", number, SURFACE_HELP))?;
        Ok((number, text.to_string()))
    };

    match verb.to_ascii_lowercase().as_str() {
        "" | "export" | "done" => Ok(SurfaceCommand::Export),
        "show" | "s" => Ok(SurfaceCommand::Show),
        "back" => Ok(SurfaceCommand::Back),
        "edit" => {
            let (n, text) = block_number(rest)?;
            Ok(SurfaceCommand::Edit(n, text))
        }
        "insert" => {
            let (n, text) = block_number(rest)?;
            Ok(SurfaceCommand::Insert(n, text))
        }
        "remove" | "rm" => {
            let (n, text) = block_number(rest)?;
            if !text.is_empty() {
                return Err(format!("remove takes only a block number. {}", SURFACE_HELP));
            }
            Ok(SurfaceCommand::Remove(n))
        }
        other => Err(format!("Unknown command: {}. {}", other, SURFACE_HELP)),
    }
}

/// 逐行读取用户输入
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// 打印提示并读取一行，输入结束时返回 None
    pub async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{} > ", prompt);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}
