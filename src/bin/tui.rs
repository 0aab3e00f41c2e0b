//! Terminal conversation view for Toyo Chat
//!
//! Renders the transcript above a one-line input box. Exchanges run on a
//! background task so the screen stays live while a reply is pending.
//!
//! Keys: Enter sends, Ctrl-L clears the conversation, Esc or Ctrl-C quits.

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
    DefaultTerminal, Frame,
};
use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use toyo_chat::api::{Message, Role};
use toyo_chat::view::{
    ConversationView, ExchangeClient, ExchangeError, ExchangeRequest, HttpExchangeClient,
    PayloadMode,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "http://127.0.0.1:3000";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const THINKING: &str = "考え中...";

type Outcome = (u64, Result<String, ExchangeError>);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let base_url = std::env::var("TOYO_CHAT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mode = match std::env::var("TOYO_CHAT_PAYLOAD") {
        Ok(value) => PayloadMode::parse(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "Unknown TOYO_CHAT_PAYLOAD, sending full history");
            PayloadMode::FullHistory
        }),
        Err(_) => PayloadMode::default(),
    };
    tracing::info!(url = %base_url, mode = ?mode, "Starting chat view");

    let client: Arc<dyn ExchangeClient> = Arc::new(HttpExchangeClient::new(&base_url)?);
    let view = ConversationView::new(mode);

    // Terminal polling blocks, so the loop gets its own thread
    let mut terminal = ratatui::try_init()?;
    let joined =
        tokio::task::spawn_blocking(move || run(&mut terminal, view, &client)).await;
    ratatui::restore();
    joined??;
    Ok(())
}

/// Log to the file named by `TOYO_TUI_LOG`; stdout belongs to the UI.
fn init_logging() -> Result<(), Box<dyn Error>> {
    let Ok(path) = std::env::var("TOYO_TUI_LOG") else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toyo_chat=debug,toyo_chat_tui=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

enum Action {
    None,
    Quit,
    Exchange(ExchangeRequest),
}

/// UI loop. Runs on a blocking thread inside the runtime.
fn run(
    terminal: &mut DefaultTerminal,
    mut view: ConversationView,
    client: &Arc<dyn ExchangeClient>,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

    loop {
        while let Ok((epoch, outcome)) = rx.try_recv() {
            view.complete(epoch, outcome);
        }

        terminal.draw(|frame| draw(frame, &view))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let TermEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match handle_key(&mut view, key) {
            Action::None => {}
            Action::Quit => return Ok(()),
            Action::Exchange(request) => spawn_exchange(client.clone(), request, tx.clone()),
        }
    }
}

/// Perform the exchange on the runtime and report back over `tx`.
fn spawn_exchange(
    client: Arc<dyn ExchangeClient>,
    request: ExchangeRequest,
    tx: UnboundedSender<Outcome>,
) {
    tokio::spawn(async move {
        let outcome = client.exchange(&request.messages).await;
        // Receiver is gone only when the UI has exited
        let _ = tx.send((request.epoch, outcome));
    });
}

fn handle_key(view: &mut ConversationView, key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if ctrl => Action::Quit,
        KeyCode::Char('l') if ctrl => {
            view.clear();
            Action::None
        }
        KeyCode::Enter => view.submit().map_or(Action::None, Action::Exchange),
        KeyCode::Backspace => {
            view.input_mut().pop();
            Action::None
        }
        KeyCode::Char(c) if !ctrl => {
            view.input_mut().push(c);
            Action::None
        }
        _ => Action::None,
    }
}

fn draw(frame: &mut Frame, view: &ConversationView) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).areas(frame.area());

    let lines = transcript_lines(view.messages(), view.is_pending());

    // Keep the newest message in view
    let inner_width = usize::from(chat_area.width.saturating_sub(2).max(1));
    let inner_height = usize::from(chat_area.height.saturating_sub(2));
    let total_rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(inner_width).max(1))
        .sum();
    let scroll = u16::try_from(total_rows.saturating_sub(inner_height)).unwrap_or(u16::MAX);

    let chat = Paragraph::new(lines)
        .block(Block::bordered().title(" 東洋医学AIチャット "))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(chat, chat_area);

    let title = if view.is_pending() {
        format!(" {THINKING} ")
    } else {
        " Enter: 送信  Ctrl-L: クリア  Esc: 終了 ".to_string()
    };
    let input = Paragraph::new(view.input().to_string()).block(Block::bordered().title(title));
    frame.render_widget(input, input_area);
}

fn speaker(role: Role) -> Span<'static> {
    let (label, color) = match role {
        Role::User => ("あなた", Color::Cyan),
        Role::Assistant => ("東洋医学AI", Color::Green),
    };
    Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn transcript_lines(messages: &[Message], pending: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        lines.push(Line::from(speaker(message.role)));
        lines.extend(message.content.lines().map(|l| Line::from(l.to_string())));
        lines.push(Line::default());
    }
    if pending {
        lines.push(Line::from(speaker(Role::Assistant)));
        lines.push(Line::from(Span::styled(
            THINKING,
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toyo_chat::view::GREETING;

    struct EchoClient;

    #[async_trait]
    impl ExchangeClient for EchoClient {
        async fn exchange(&self, messages: &[Message]) -> Result<String, ExchangeError> {
            Ok(format!("{} messages", messages.len()))
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(view: &mut ConversationView, text: &str) {
        for c in text.chars() {
            handle_key(view, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_and_enter_submit() {
        let mut view = ConversationView::default();
        type_text(&mut view, "肩こり");
        handle_key(&mut view, press(KeyCode::Backspace));
        assert_eq!(view.input(), "肩こ");

        let Action::Exchange(request) = handle_key(&mut view, press(KeyCode::Enter)) else {
            panic!("expected an exchange");
        };
        assert_eq!(request.messages.last(), Some(&Message::user("肩こ")));
        assert!(view.is_pending());

        type_text(&mut view, "追加");
        assert!(matches!(handle_key(&mut view, press(KeyCode::Enter)), Action::None));
        assert_eq!(view.messages().len(), 2);
    }

    #[test]
    fn test_control_keys() {
        let mut view = ConversationView::default();
        type_text(&mut view, "q");
        handle_key(&mut view, press(KeyCode::Enter));
        view.complete(0, Ok("a".to_string()));
        assert_eq!(view.messages().len(), 3);

        assert!(matches!(handle_key(&mut view, ctrl('l')), Action::None));
        assert_eq!(view.messages(), [Message::assistant(GREETING)]);

        assert!(matches!(handle_key(&mut view, ctrl('c')), Action::Quit));
        assert!(matches!(handle_key(&mut view, press(KeyCode::Esc)), Action::Quit));
    }

    #[tokio::test]
    async fn test_exchange_from_ui_thread_reports_back() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
        let mut view = ConversationView::default();
        view.set_input("舌診について");
        let request = view.submit().unwrap();

        // Same thread kind the UI loop runs on
        let client: Arc<dyn ExchangeClient> = Arc::new(EchoClient);
        tokio::task::spawn_blocking(move || spawn_exchange(client, request, tx))
            .await
            .unwrap();

        let (epoch, outcome) = rx.recv().await.unwrap();
        view.complete(epoch, outcome);
        assert!(!view.is_pending());
        assert_eq!(view.messages().last(), Some(&Message::assistant("2 messages")));
    }

    #[test]
    fn test_transcript_lines_show_thinking() {
        let messages = [Message::assistant(GREETING), Message::user("一行目\n二行目")];
        let idle = transcript_lines(&messages, false);
        // label + content + blank for greeting, label + two lines + blank for user
        assert_eq!(idle.len(), 7);

        let pending = transcript_lines(&messages, true);
        assert_eq!(pending.len(), 9);
        assert_eq!(pending.last().unwrap().to_string(), THINKING);
    }
}
