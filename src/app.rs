use crate::api::ExamApi;
use crate::clients::ExamClient;
use crate::config::Config;
use crate::models::{AttemptStatus, Question};
use crate::session::{InitOutcome, SessionCommand, SessionController, SessionEvent, SessionRunner};
use crate::store::TomlAttemptStore;
use crate::utils::logging::{format_clock, log_startup, log_summary, truncate_text};
use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    client: ExamClient,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置不完整")?;

        log_startup(&config);

        let client = ExamClient::new(&config)?;

        Ok(Self { config, client })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        if self.config.show_catalog {
            self.print_catalog().await?;
        }

        let store = TomlAttemptStore::new(&self.config.attempt_store_path);
        let mut controller = SessionController::new(self.client.clone(), store);

        let initialized = match &self.config.test_id {
            Some(test_id) => controller.initialize(test_id, &self.config.user_id).await,
            // 未指定考试时使用整卷，交卷前重复运行会继续同一场
            None => {
                controller
                    .initialize_full_test(self.config.test_type, &self.config.user_id)
                    .await
            }
        };

        match initialized {
            Ok(InitOutcome::AlreadySubmitted) => {
                info!("✓ 本场考试已经交卷");
                log_summary(&controller.summary());
                return Ok(());
            }
            Ok(outcome) => info!("✓ 会话初始化完成: {:?}", outcome),
            Err(e) => {
                error!("❌ 会话初始化失败: {}", e);
                return Err(e.into());
            }
        }

        print_help();
        if let Some(view) = controller.attempt() {
            if let Some(question) = view.current_question() {
                print_question(
                    view.current,
                    question,
                    view.answers.get(&question.id).copied(),
                    false,
                );
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (ev_tx, ev_rx) = mpsc::channel(256);

        let reader = tokio::spawn(read_commands(cmd_tx));
        let printer = tokio::spawn(print_events(ev_rx));

        let runner = SessionRunner::new(controller, self.config.poll_interval);
        let controller = runner.run(cmd_rx, ev_tx).await;

        reader.abort();
        if let Err(e) = printer.await {
            warn!("事件输出任务异常结束: {}", e);
        }

        if controller.status() != AttemptStatus::Submitted {
            info!("💾 作答未交卷，重新运行即可继续");
        }
        log_summary(&controller.summary());

        Ok(())
    }

    /// 打印科目与章节目录
    async fn print_catalog(&self) -> Result<()> {
        info!("\n📚 正在加载题库目录...");
        let subjects = self.client.list_subjects(None).await?;

        let chapters = join_all(
            subjects
                .iter()
                .map(|subject| self.client.list_chapters(&subject.id)),
        )
        .await;

        for (subject, chapters) in subjects.iter().zip(chapters) {
            match chapters {
                Ok(chapters) => info!(
                    "  {} [{}] {} 年级: {} 个章节",
                    subject.name,
                    subject.code,
                    subject.standard,
                    chapters.len()
                ),
                Err(e) => warn!("  {} 章节加载失败: {}", subject.name, e),
            }
        }
        Ok(())
    }
}

/// 解析一行用户输入，题号从 1 开始
///
/// - `a <n> <k>` 第 n 题选第 k 个选项，`a <k>` 作用于当前题
/// - `m <n>` 标记/取消标记第 n 题，`m` 作用于当前题
/// - `c <n>` 清除第 n 题作答，`c` 作用于当前题
/// - `g <n>` 跳到第 n 题
/// - `n` / `p` 下一题 / 上一题
/// - `s` 交卷，`q` 退出（保留作答）
///
/// 多余的参数视为无效输入
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["a", option] => option.parse().ok().map(SessionCommand::AnswerCurrent),
        ["a", number, option] => Some(SessionCommand::AnswerAt {
            index: parse_question_number(number)?,
            option: option.parse().ok()?,
        }),
        ["m"] => Some(SessionCommand::MarkCurrent),
        ["m", number] => parse_question_number(number).map(SessionCommand::MarkAt),
        ["c"] => Some(SessionCommand::ClearCurrent),
        ["c", number] => parse_question_number(number).map(SessionCommand::ClearAt),
        ["g", number] => parse_question_number(number).map(SessionCommand::GoTo),
        ["n"] => Some(SessionCommand::Next),
        ["p"] => Some(SessionCommand::Prev),
        ["s"] => Some(SessionCommand::Submit),
        ["q"] => Some(SessionCommand::Quit),
        _ => None,
    }
}

/// 1 开始的题号转为下标
fn parse_question_number(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

async fn read_commands(commands: mpsc::Sender<SessionCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(command) => {
                        if commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    None => print_help(),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("读取输入失败: {}", e);
                break;
            }
        }
    }
}

async fn print_events(mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Countdown { time_left } => {
                // 每分钟提示一次，最后一分钟每 10 秒提示
                if time_left % 60 == 0 || (time_left < 60 && time_left % 10 == 0) {
                    info!("⏳ 剩余时间 {}", format_clock(time_left));
                }
            }
            SessionEvent::Polled { time_left } => {
                info!("🔄 已同步，剩余时间 {}", format_clock(time_left));
            }
            SessionEvent::AnswerSaved {
                question_id,
                option,
            } => info!("✓ 题目 {} 已选择 {}", question_id, option),
            SessionEvent::Marked {
                question_id,
                marked,
            } => {
                if marked {
                    info!("🔖 已标记题目 {}", question_id);
                } else {
                    info!("已取消标记题目 {}", question_id);
                }
            }
            SessionEvent::Cleared { question_id } => info!("已清除题目 {} 的作答", question_id),
            SessionEvent::Navigated {
                index,
                question,
                selected,
                marked,
            } => print_question(index, &question, selected, marked),
            SessionEvent::TransientError(message) => warn!("⚠️ {}", message),
            SessionEvent::Submitted => info!("🎉 已交卷"),
            SessionEvent::Stopped => break,
        }
    }
}

fn print_question(index: usize, question: &Question, selected: Option<u8>, marked: bool) {
    println!();
    println!(
        "第 {} 题 [{}]{}",
        index + 1,
        question.subject,
        if marked { " 🔖" } else { "" }
    );
    println!("{}", truncate_text(&question.prompt, 400));
    for (i, option) in question.options.iter().enumerate() {
        let order = i + 1;
        let cursor = if selected == Some(order as u8) { "●" } else { "○" };
        println!("  {} {}. {}", cursor, order, option);
    }
}

fn print_help() {
    println!("指令: a <题号> <选项> 作答 | m <题号> 标记 | c <题号> 清除 | g <题号> 跳转 | n 下一题 | p 上一题 | s 交卷 | q 退出");
    println!("      省略题号时作用于当前题");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_commands() {
        assert_eq!(
            parse_command("a 3 2"),
            Some(SessionCommand::AnswerAt { index: 2, option: 2 })
        );
        assert_eq!(parse_command("m 1"), Some(SessionCommand::MarkAt(0)));
        assert_eq!(parse_command("c 2"), Some(SessionCommand::ClearAt(1)));
    }

    #[test]
    fn parses_answer_and_navigation() {
        assert_eq!(parse_command("a 2"), Some(SessionCommand::AnswerCurrent(2)));
        assert_eq!(parse_command("m"), Some(SessionCommand::MarkCurrent));
        assert_eq!(parse_command("c"), Some(SessionCommand::ClearCurrent));
        assert_eq!(parse_command("  g 3 "), Some(SessionCommand::GoTo(2)));
        assert_eq!(parse_command("s"), Some(SessionCommand::Submit));
        assert_eq!(parse_command("q"), Some(SessionCommand::Quit));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_command("a"), None);
        assert_eq!(parse_command("a x"), None);
        assert_eq!(parse_command("g 0"), None);
        assert_eq!(parse_command("a 0 2"), None);
        assert_eq!(parse_command("a 1 2 3"), None);
        assert_eq!(parse_command("m 1 2"), None);
        assert_eq!(parse_command("g 2 extra"), None);
        assert_eq!(parse_command("s now"), None);
        assert_eq!(parse_command("hello"), None);
    }
}
