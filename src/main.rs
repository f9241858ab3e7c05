use std::io;
use std::time::{Duration, Instant};

use snake_duel::render::{rasterize, to_text};
use snake_duel::{
    ArenaConfig, Direction, DuelState, MatchPhase, PlayerId, RoundOutcome, RoundReport,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Alignment,
    style::Stylize,
    widgets::{Block, Borders, Paragraph, Wrap},
};

fn main() -> io::Result<()> {
    // --- Init terminal ---
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let res = run(&mut terminal);

    // --- Restore terminal even on error ---
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

/// Fixed tick period; the host owns the clock, the core only ever sees
/// the `now` passed into `tick`.
const TICK_MILLIS: u64 = 120;

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    let mut game = DuelState::new(ArenaConfig::default());
    let tick_rate = Duration::from_millis(TICK_MILLIS);
    let mut last_tick = Instant::now();
    let mut last_report: Option<RoundReport> = None;

    let mut running = true;
    while running {
        // --- Input (non-blocking) ---
        let now = Instant::now();
        let timeout = tick_rate
            .checked_sub(now.saturating_duration_since(last_tick))
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if handle_key(&mut game, &mut last_report, key) {
                        running = false; // requested quit
                    }
                }
            }
        }

        // --- Tick ---
        if last_tick.elapsed() >= tick_rate {
            match game.tick(Instant::now()) {
                Ok(Some(report)) => last_report = Some(report),
                Ok(None) => {}
                // Invariant breakage means the state can't be trusted;
                // tear down and report.
                Err(e) => return Err(io::Error::other(e)),
            }
            last_tick = Instant::now();
        }

        // --- Render ---
        terminal.draw(|f| {
            let area = f.area();
            let title = title_line(&game, last_report.as_ref());
            let board = to_text(&rasterize(&game));

            let block = Block::default().borders(Borders::ALL).title(title.bold());

            // --- Fit frame to the board; Block adds a 1-char border ---
            let gw = game.config().width as u16;
            let gh = game.config().height as u16;
            let outer_w = gw.saturating_add(2);
            let outer_h = gh.saturating_add(2);

            // Center the frame within the terminal area.
            let x = area.x.saturating_add(area.width.saturating_sub(outer_w) / 2);
            let y = area.y.saturating_add(area.height.saturating_sub(outer_h) / 2);
            let frame_area = ratatui::layout::Rect::new(x, y, outer_w, outer_h);

            let para = Paragraph::new(board)
                .block(block)
                .alignment(Alignment::Left)
                .wrap(Wrap { trim: false });

            f.render_widget(para, frame_area);
        })?;
    }

    Ok(())
}

fn effect_badges(game: &DuelState, player: PlayerId) -> String {
    game.snake(player)
        .effects()
        .active()
        .map(|e| match e {
            snake_duel::Effect::SpeedBoost => 'S',
            snake_duel::Effect::Invincible => 'I',
            snake_duel::Effect::DoubleScore => 'D',
        })
        .collect()
}

fn title_line(game: &DuelState, last_report: Option<&RoundReport>) -> String {
    let [s1, s2] = game.scores();
    let [w1, w2] = game.round_wins();
    let status = match game.phase() {
        MatchPhase::Idle => "space to start".to_string(),
        MatchPhase::Running => {
            let b1 = effect_badges(game, PlayerId::One);
            let b2 = effect_badges(game, PlayerId::Two);
            match (b1.is_empty(), b2.is_empty()) {
                (true, true) => "space to pause".to_string(),
                _ => format!("P1[{b1}] P2[{b2}]"),
            }
        }
        MatchPhase::Paused => "paused — space to resume".to_string(),
        MatchPhase::Ended => match last_report.map(|r| r.outcome) {
            Some(RoundOutcome::Win(PlayerId::One)) => "P1 takes the round — space".to_string(),
            Some(RoundOutcome::Win(PlayerId::Two)) => "P2 takes the round — space".to_string(),
            _ => "draw — space".to_string(),
        },
    };
    format!(" snake duel — P1 {s1} ({w1}) · P2 {s2} ({w2}) • {status} ")
}

/// Returns true if the caller should quit.
fn handle_key(game: &mut DuelState, last_report: &mut Option<RoundReport>, key: KeyEvent) -> bool {
    match key.code {
        // Quit keys
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,

        // Player one: wasd
        KeyCode::Char('w') => game.set_direction(PlayerId::One, Direction::Up),
        KeyCode::Char('s') => game.set_direction(PlayerId::One, Direction::Down),
        KeyCode::Char('a') => game.set_direction(PlayerId::One, Direction::Left),
        KeyCode::Char('d') => game.set_direction(PlayerId::One, Direction::Right),

        // Player two: vim keys and arrows
        KeyCode::Char('k') | KeyCode::Up => game.set_direction(PlayerId::Two, Direction::Up),
        KeyCode::Char('j') | KeyCode::Down => game.set_direction(PlayerId::Two, Direction::Down),
        KeyCode::Char('h') | KeyCode::Left => game.set_direction(PlayerId::Two, Direction::Left),
        KeyCode::Char('l') | KeyCode::Right => game.set_direction(PlayerId::Two, Direction::Right),

        // Lifecycle: space starts or toggles pause, r resets the match
        KeyCode::Char(' ') => match game.phase() {
            MatchPhase::Idle | MatchPhase::Ended => {
                *last_report = None;
                game.start_round();
            }
            MatchPhase::Running => game.pause(),
            MatchPhase::Paused => game.resume(),
        },
        KeyCode::Char('r') => {
            *last_report = None;
            game.reset_match();
        }

        _ => {}
    }
    false
}
