use std::future::Future;
use std::io::{self, Write};

use anyhow::Result;
use colored::*;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::analyzer::{InstructionStep, RecipeAnalysis, instruction_steps};
use crate::chat::{ChatMode, QuickPrompt};
use crate::intent::Intent;
use crate::nutrition::NutritionChart;
use crate::presets::PRESETS;
use crate::session::{CookingSession, RenderFrame, SessionError, SessionSummary, TimerView};
use crate::timer::{CompletionLogEntry, Countdown, TimerState, format_clock};

const BAR_SCALE: u64 = 1000;

/// Terminal front end: reads intents from stdin and renders the session.
pub struct TerminalUI {
    colorful: bool,
    progress_bars: bool,
}

impl TerminalUI {
    pub fn new(colorful: bool, progress_bars: bool) -> Self {
        if !colorful {
            colored::control::set_override(false);
        }
        Self {
            colorful,
            progress_bars,
        }
    }

    pub fn banner(&self) {
        println!("{}", "=".repeat(60).bright_yellow());
        println!("{}", "🍽️  Kitchen Copilot".bright_white().bold());
        println!("{}", "=".repeat(60).bright_yellow());
        println!("Paste a recipe with 'analyze <text>', or type 'help'.");
        println!();
    }

    /// Read-eval-render loop. Returns on `quit` or end of input.
    pub async fn run(&self, session: &mut CookingSession) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{} ", "🍳 >".bright_yellow());
            io::stdout().flush()?;

            let Some(line) = next_line_or_interrupt(&mut lines, tokio::signal::ctrl_c()).await?
            else {
                println!();
                break;
            };

            match Intent::parse(&line) {
                Ok(Intent::Quit) => break,
                Ok(intent) => {
                    if let Err(e) = self.handle(session, intent).await {
                        match e.downcast_ref::<SessionError>() {
                            Some(session_error) => self.display_session_error(session_error),
                            None => self.display_error(&format!("{:#}", e)),
                        }
                    }
                }
                Err(e) => self.display_error(&e.to_string()),
            }

            // Every interaction is a render pass
            let frame = session.render_pass().await;
            self.announce_completed(&frame.newly_completed);
        }
        Ok(())
    }

    /// Apply one intent to the session and print its result.
    pub async fn handle(&self, session: &mut CookingSession, intent: Intent) -> Result<()> {
        debug!("Handling {:?}", intent);
        match intent {
            Intent::Help => self.print_help(),
            Intent::Quit => {}
            Intent::Recipe(text) => {
                session.set_recipe_input(&text);
                println!(
                    "📝 Recipe saved ({} characters). Type 'analyze' to send it to the assistant.",
                    session.recipe_input().chars().count()
                );
            }
            Intent::Analyze(text) => {
                println!("{}", "🧠 Analyzing...".bright_cyan());
                let analysis = session.analyze_recipe(text.as_deref()).await?;
                self.print_analysis(&analysis);
            }
            Intent::Presets => self.print_presets(),
            Intent::Preset(query) => {
                let preset = session.select_preset(&query).await?;
                println!("📖 Loaded '{}':", preset.name.bright_white().bold());
                println!("{}", preset.recipe);
                println!("Type 'analyze' to send it to the assistant.");
            }
            Intent::AddTimer {
                label,
                minutes,
                seconds,
            } => {
                session.add_manual_timer(&label, minutes, seconds).await?;
                self.display_success(&format!(
                    "Timer '{}' added for {} min {} sec",
                    label.trim(),
                    minutes,
                    seconds
                ));
            }
            Intent::Start(reference) => {
                let label = self.resolve_label(session, &reference);
                session.start_timer(&label).await?;
                println!("▶️  '{}' started", label);
            }
            Intent::Pause(reference) => {
                let label = self.resolve_label(session, &reference);
                match session.pause_timer(&label).await? {
                    Countdown::Completed(entry) => self.announce_completed(&[entry]),
                    Countdown::Remaining(secs) | Countdown::Stopped { remaining_secs: secs } => {
                        println!("⏸  '{}' paused at {}", label, format_clock(secs))
                    }
                }
            }
            Intent::Resume(reference) => {
                let label = self.resolve_label(session, &reference);
                session.resume_timer(&label).await?;
                println!("▶️  '{}' resumed", label);
            }
            Intent::Stop(reference) => {
                let label = self.resolve_label(session, &reference);
                session.stop_timer(&label).await?;
                println!("🗑  '{}' stopped", label);
            }
            Intent::Timers => {
                let frame = session.render_pass().await;
                self.announce_completed(&frame.newly_completed);
                self.print_timers(&frame);
            }
            Intent::Watch => self.watch(session).await?,
            Intent::Log => self.print_log(session.completion_log()),
            Intent::Steps(reference) => {
                let steps = match reference {
                    Some(reference) => {
                        let label = self.resolve_label(session, &reference);
                        session.timer_steps(&label).unwrap_or_default()
                    }
                    None => session.instruction_steps(),
                };
                self.print_steps(&steps);
            }
            Intent::Nutrition { reference, strict: true } => {
                let label = self.resolve_label(session, &reference);
                let chart = session.nutrition_strict(&label)?;
                self.print_nutrition(&label, &chart);
            }
            Intent::Nutrition { reference, strict: false } => {
                let label = self.resolve_label(session, &reference);
                match session.nutrition_for(&label) {
                    Some(breakdown) => {
                        self.print_nutrition(&label, &breakdown.chart);
                        for skipped in &breakdown.skipped {
                            debug!("Skipped nutrition line: {}", skipped);
                        }
                    }
                    None => self.display_error(&format!("no timer labelled '{}'", label)),
                }
            }
            Intent::Mode(mode) => {
                session.set_chat_mode(mode);
                println!("💬 Chat mode: {}", mode);
            }
            Intent::Chat { mode, text } => {
                let mode = mode.unwrap_or_else(|| session.chat_mode());
                if !text.trim().is_empty() {
                    println!("{} {}", "You:".bright_white().bold(), text.trim());
                } else if let Some(prompt) = session.pending_quick_prompt() {
                    println!("{} {}", "You:".bright_white().bold(), prompt.text());
                }
                println!("{}", "AI is thinking...".dimmed());
                let reply = session.send_chat(mode, &text).await?;
                println!("{} {}", "Assistant:".bright_green().bold(), reply);
            }
            Intent::Quick(prompt) => {
                session.queue_quick_prompt(prompt);
                println!("⚡ Queued: \"{}\" (send with 'chat')", prompt.text());
            }
            Intent::History => self.print_history(session),
            Intent::Stats => {
                let metrics = session.metrics().await;
                println!("🤖 API calls: {} ({} failed)", metrics.total_api_calls, metrics.api_errors);
                println!("🪙  Tokens (approx.): {}", metrics.total_tokens);
                println!("💰 Cost: ${:.4}", metrics.total_cost);
                println!(
                    "⏲️  Timers added: {}, completed: {}",
                    metrics.timers_added, metrics.timers_completed
                );
                println!("🍳 Recipes analyzed: {}", metrics.recipes_analyzed);
                println!("💬 Chat turns: {}", metrics.chat_turns);
            }
        }
        Ok(())
    }

    /// A bare number picks the n-th active timer, unless a timer is literally
    /// labelled with that number.
    fn resolve_label(&self, session: &CookingSession, reference: &str) -> String {
        let views = session.timer_views();
        if views.iter().any(|v| v.label == reference) {
            return reference.to_string();
        }
        reference
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| views.get(i))
            .map(|v| v.label.clone())
            .unwrap_or_else(|| reference.to_string())
    }

    /// Redraw the running timers at the session's render cadence until none
    /// are left running or Ctrl-C is pressed.
    async fn watch(&self, session: &mut CookingSession) -> Result<()> {
        if !session.has_running_timers() {
            if session.has_timers() {
                println!("No timers are running. Start one with 'start <label>'.");
            } else {
                println!("No timers yet. Add one with 'add <min> <sec> <label>'.");
            }
            return Ok(());
        }

        if self.colorful {
            execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
        println!("{}", "⏱️  Watching timers (Ctrl-C to return)".bright_white().bold());

        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{prefix:>18.bold} {bar:40.yellow/white} {msg}")?
            .progress_chars("█▓░");
        let mut bars: Vec<(String, ProgressBar)> = Vec::new();

        let mut ticker = tokio::time::interval(session.render_interval());
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = ticker.tick() => {
                    let frame = session.render_pass().await;

                    for entry in &frame.newly_completed {
                        if let Some(index) = bars.iter().position(|(label, _)| *label == entry.label) {
                            let (_, bar) = bars.remove(index);
                            bar.finish_with_message("⏰ DONE!".bright_red().bold().to_string());
                        }
                        if !self.progress_bars {
                            self.announce_completed(std::slice::from_ref(entry));
                        }
                    }

                    if self.progress_bars {
                        for view in frame.timers.iter().filter(|v| v.state != TimerState::Idle) {
                            let bar = match bars.iter().find(|(label, _)| *label == view.label) {
                                Some((_, bar)) => bar.clone(),
                                None => {
                                    let bar = multi.add(ProgressBar::new(BAR_SCALE));
                                    bar.set_style(style.clone());
                                    bar.set_prefix(view.label.clone());
                                    bars.push((view.label.clone(), bar.clone()));
                                    bar
                                }
                            };
                            bar.set_position((view.progress * BAR_SCALE as f64) as u64);
                            bar.set_message(format!("{} {}", view.clock, view.state));
                        }
                    } else {
                        let line: Vec<String> = frame
                            .timers
                            .iter()
                            .filter(|v| v.state != TimerState::Idle)
                            .map(|v| format!("{} {} ({})", v.label, v.clock, v.state))
                            .collect();
                        println!("{}", line.join(" | "));
                    }

                    if !session.has_running_timers() {
                        break;
                    }
                }
            }
        }

        for (_, bar) in bars {
            bar.abandon();
        }
        println!();
        Ok(())
    }

    fn announce_completed(&self, entries: &[CompletionLogEntry]) {
        for entry in entries {
            println!(
                "{}",
                format!("⏰ '{}' is DONE!", entry.label).bright_red().bold()
            );
        }
    }

    fn print_analysis(&self, analysis: &RecipeAnalysis) {
        let fallback_note = if analysis.used_fallback {
            " (estimate unavailable, using default)"
        } else {
            ""
        };
        self.display_success(&format!(
            "Timer for '{}' added! Duration: {} min{}",
            analysis.label, analysis.minutes, fallback_note
        ));
        println!();
        println!("{}", "🔪 Step-by-Step Instructions".bright_white().bold());
        self.print_steps(&instruction_steps(&analysis.steps));
        println!();
        println!("Type 'start {}' to begin, or 'nutrition 1' for the breakdown.", analysis.label);
    }

    fn print_timers(&self, frame: &RenderFrame) {
        if frame.timers.is_empty() {
            println!("No active timers.");
            return;
        }
        println!("{}", "⏱️  Your Cooking Timers".bright_white().bold());
        for (i, view) in frame.timers.iter().enumerate() {
            println!("{:>2}. {}", i + 1, self.timer_line(view));
        }
    }

    fn timer_line(&self, view: &TimerView) -> String {
        let filled = ((view.progress * 20.0).round() as usize).min(20);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));
        let state = match view.state {
            TimerState::Running { .. } => "running".bright_green(),
            TimerState::Paused => "paused".bright_yellow(),
            TimerState::Idle => "idle".dimmed(),
        };
        let extras = match (view.has_steps, view.has_nutrition) {
            (true, true) => " 🔪🥗",
            (true, false) => " 🔪",
            (false, true) => " 🥗",
            (false, false) => "",
        };
        // Last minute of a running timer is highlighted
        let clock = match view.state {
            TimerState::Running { .. } if view.remaining_secs < 60.0 => view.clock.bright_red(),
            _ => view.clock.bright_white(),
        };
        format!(
            "{} - ⏳ {} {} {}{}",
            view.label.bold(),
            clock,
            bar.yellow(),
            state,
            extras
        )
    }

    fn print_log(&self, log: &[CompletionLogEntry]) {
        if log.is_empty() {
            println!("No timers have finished yet.");
            return;
        }
        println!("{}", "📊 Completed Timers Log".bright_white().bold());
        for entry in log {
            println!(
                "{} completed at {}",
                entry.label.bold(),
                entry.completed_at.format("%a %b %e %H:%M:%S %Y").to_string().bold()
            );
        }
    }

    fn print_steps(&self, steps: &[InstructionStep]) {
        if steps.is_empty() {
            println!("No instructions yet. Analyze a recipe first.");
            return;
        }
        for step in steps {
            println!("{} {}", format!("Step {}:", step.number).bright_cyan(), step.text);
        }
    }

    fn print_nutrition(&self, label: &str, chart: &NutritionChart) {
        if chart.is_empty() {
            println!("No nutrition data for '{}'.", label);
            return;
        }
        println!("{}", format!("🥗 Nutrition for {}", label).bright_white().bold());
        let shares = chart.shares();
        for slice in &chart.slices {
            let share = shares
                .iter()
                .find(|(l, _)| *l == slice.label)
                .map(|(_, s)| *s)
                .unwrap_or(0.0);
            let width = (share * 30.0).round() as usize;
            println!(
                "{:>16} {:>8} {} {:.0}%",
                slice.label,
                slice.value,
                "█".repeat(width).green(),
                share * 100.0
            );
        }
    }

    fn print_history(&self, session: &CookingSession) {
        let transcript = session.transcript();
        if transcript.is_empty() {
            println!("No chat yet. Try 'chat ideas leftover rice'.");
            return;
        }
        println!("{}", "📜 Chat History".bright_white().bold());
        for turn in transcript.turns() {
            println!("{}: {}", turn.role.to_string().bold(), turn.content);
        }
    }

    fn print_presets(&self) {
        println!("{}", "📚 Preset Recipes".bright_white().bold());
        for (i, preset) in PRESETS.iter().enumerate() {
            println!("{:>2}. {}", i + 1, preset.name);
        }
        println!("Load one with 'preset <number or name>'.");
    }

    fn print_help(&self) {
        println!("{}", "Recipe".bright_white().bold());
        println!("  analyze [text]          analyze a recipe (or the loaded one)");
        println!("  recipe <text>           set the recipe without analyzing");
        println!("  presets | preset <n>    list or load a preset recipe");
        println!("  steps [timer]           show step-by-step instructions");
        println!("  nutrition [--strict] <timer>   show the nutrition breakdown");
        println!("{}", "Timers".bright_white().bold());
        println!("  add <min> <sec> [label] add a manual timer");
        println!("  start|pause|resume|stop <timer>   timers can be given by number");
        println!("  timers | watch | log    list, watch live, or show finished timers");
        println!("{}", "Chat".bright_white().bold());
        let modes: Vec<String> = ChatMode::ALL.iter().map(|m| m.to_string()).collect();
        println!("  chat [ideas|tips|subs] <text>   modes: {}", modes.join(", "));
        let quick: Vec<&str> = QuickPrompt::ALL.iter().map(|q| q.keyword()).collect();
        println!("  quick <{}>  queue a quick prompt", quick.join("|"));
        println!("  mode <ideas|tips|subs> | history | stats | quit");
    }

    pub fn print_summary(&self, summary: &SessionSummary) {
        println!();
        println!("{}", "=".repeat(60).bright_yellow());
        println!("{}", "Session Summary".bright_white().bold());
        println!("{}", "=".repeat(60).bright_yellow());
        println!("🆔 Session: {}", summary.id.to_string().dimmed());
        let secs = summary.duration.num_seconds().max(0);
        println!("⏱️  Duration: {}:{:02}", secs / 60, secs % 60);
        println!(
            "✅ Timers completed: {}",
            summary.timers_completed.to_string().bright_green()
        );
        if summary.timers_abandoned > 0 {
            println!(
                "🗑  Timers still active: {}",
                summary.timers_abandoned.to_string().bright_red()
            );
        }
        println!("💬 Chat turns: {}", summary.chat_turns.to_string().bright_cyan());
        println!(
            "🤖 API calls: {} (${:.4})",
            summary.metrics.total_api_calls.to_string().bright_cyan(),
            summary.metrics.total_cost
        );
    }

    pub fn display_success(&self, message: &str) {
        println!("{} {}", "✅".green(), message);
    }

    pub fn display_error(&self, error: &str) {
        println!("{} {}", "✗ Error:".red().bold(), error.white());
    }

    /// Render a session error the way the user should see it.
    pub fn display_session_error(&self, error: &SessionError) {
        match error {
            SessionError::Timer(_) | SessionError::OutOfRange { .. } | SessionError::EmptyLabel => {
                println!("{} {}", "⚠️".yellow(), error)
            }
            _ => self.display_error(&error.to_string()),
        }
    }
}

/// Next prompt line, or `None` at end of input or once `interrupt` resolves.
async fn next_line_or_interrupt<R, F>(lines: &mut Lines<R>, interrupt: F) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_ends_prompt_while_waiting_for_input() {
        // Writer half stays open, so the reader would wait forever
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let line = next_line_or_interrupt(&mut lines, async { Ok::<(), io::Error>(()) }).await.unwrap();
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn test_typed_line_is_returned_without_interrupt() {
        let mut lines = BufReader::new("timers\nquit\n".as_bytes()).lines();

        let first = next_line_or_interrupt(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(first.as_deref(), Some("timers"));
        let second = next_line_or_interrupt(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(second.as_deref(), Some("quit"));
    }
}
