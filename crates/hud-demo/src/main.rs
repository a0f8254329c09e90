#![forbid(unsafe_code)]

//! Simulated glasses session: a wireless link and a touch sensor feed
//! events from their own threads while the main thread ticks the consumer
//! loop, swaps pages, and arms banner timers.
//!
//! Run with: `cargo run -p hud-demo -- --ticks 80 --dump-tree`
//! (`RUST_LOG=debug` for the full dispatch trace.)

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Parser;
use hud::prelude::core::channel::MainChannel;
use hud::prelude::core::dispatch::Dispatcher;
use hud::prelude::core::event::{
    BondingPhase, BondingState, CallNotification, ChangePage, Click, ConnectionPhase,
    ConnectionState, DoubleClick, InputEvent, MessageNotification, PageKind, Press, RemoteEvent,
    SwipeAnticlockwise, SwipeClockwise, UpdateMessage,
};
use hud::prelude::runtime::main_loop::MainLoop;
use hud::prelude::runtime::timer::{DelayTimer, TimerDispatcher};
use hud::prelude::view::geometry::{Point, Rect};
use hud::prelude::view::node::Node;

/// Page order for swipe navigation.
const PAGES: [PageKind; 5] = [
    PageKind::Home,
    PageKind::Weather,
    PageKind::Translation,
    PageKind::Connection,
    PageKind::MessageNotification,
];

#[derive(Debug, Parser)]
#[command(
    name = "hud-demo",
    about = "Simulated glasses session over the hud event stack",
    version
)]
struct Cli {
    /// Cooperative ticks before the session ends.
    #[arg(long, default_value_t = 80)]
    ticks: u32,

    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 25)]
    tick_ms: u64,

    /// How long notification banners stay up, in milliseconds.
    #[arg(long, default_value_t = 400)]
    banner_ms: u64,

    /// Print the widget tree when the session ends.
    #[arg(long)]
    dump_tree: bool,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    run(&cli);
}

fn run(cli: &Cli) {
    let channel = MainChannel::new();
    let remote: Dispatcher<RemoteEvent> = Dispatcher::new(channel.clone());
    let input: Dispatcher<InputEvent> = Dispatcher::new(channel.clone());
    let timers = TimerDispatcher::new(channel.clone());

    let window = build_window(&remote, &input, &timers, cli.banner_ms);

    let link = spawn_link(remote.clone());
    let sensor = spawn_sensor(input.clone());

    // Cooperative main loop, embedded style: drain what is queued, then
    // yield the thread until the next tick.
    let mut main_loop = MainLoop::new(channel);
    for _ in 0..cli.ticks {
        main_loop.tick();
        thread::sleep(Duration::from_millis(cli.tick_ms));
    }

    link.join().expect("link thread panicked");
    sensor.join().expect("sensor thread panicked");
    main_loop.tick();

    tracing::info!(
        tasks = main_loop.tasks_run(),
        uptime = ?main_loop.uptime(),
        "session ended"
    );
    if cli.dump_tree {
        print!("{}", window.format_tree());
    }
}

/// Build the fixed chrome (status line, caption, banner) and the swappable
/// page area, and wire everything to the dispatchers.
fn build_window(
    remote: &Dispatcher<RemoteEvent>,
    input: &Dispatcher<InputEvent>,
    timers: &TimerDispatcher,
    banner_ms: u64,
) -> Arc<Node> {
    let window = Node::new("window", Rect::new(0, 0, 128, 64));

    // Status line: reflects link and bonding state.
    let status = Node::new("status", Rect::new(0, 0, 128, 12));
    status.attach(&window).expect("fresh node must attach");
    status.set_visible(false);
    status.set_on_remote(|node, event| match event {
        RemoteEvent::Connection(state) => {
            node.set_visible(state.phase == ConnectionPhase::Connected);
            tracing::info!(phase = ?state.phase, "link state changed");
        }
        RemoteEvent::Bonding(state) => match state.phase {
            BondingPhase::Bonding => {
                tracing::info!(passkey = state.passkey, "confirm passkey on the phone")
            }
            phase => tracing::info!(?phase, "bonding state changed"),
        },
        _ => {}
    });
    status.bind_remote(remote, ConnectionState::NAME);
    status.bind_remote(remote, BondingState::NAME);

    // Caption area: free-form text pushed from the companion.
    let caption = Node::new("caption", Rect::new(0, 52, 128, 12));
    caption.attach(&window).expect("fresh node must attach");
    caption.set_on_remote(|node, event| {
        if let RemoteEvent::Message(message) = event {
            node.set_visible(true);
            tracing::info!(text = message.text.as_str(), "caption updated");
        }
    });
    caption.bind_remote(remote, UpdateMessage::NAME);

    // Notification banner: pops up on phone activity, hides on a timer.
    let banner = Node::new("banner", Rect::new(0, 0, 128, 64));
    banner.set_center(Point::new(64, 32));
    banner.set_visible(false);
    banner.attach(&window).expect("fresh node must attach");
    {
        // The timer is owned by the handler closure, so it lives and dies
        // with the banner node; drop cancels any pending hide.
        let timer = Arc::new(Mutex::new(DelayTimer::new(timers.clone())));
        let weak_banner = Arc::downgrade(&banner);
        let hide = banner_ms;
        banner.set_on_remote(move |node, event| {
            let kind = match event {
                RemoteEvent::CallNotification(_) => "call",
                RemoteEvent::MessageNotification(_) => "message",
                _ => return,
            };
            node.set_visible(true);
            tracing::info!(kind, "notification banner up");
            let weak = weak_banner.clone();
            timer
                .lock()
                .expect("banner timer mutex")
                .delay(Duration::from_millis(hide), move || {
                    if let Some(banner) = weak.upgrade() {
                        banner.set_visible(false);
                        tracing::info!("notification banner down");
                    }
                });
        });
    }
    banner.bind_remote(remote, CallNotification::NAME);
    banner.bind_remote(remote, MessageNotification::NAME);

    // Swappable page area: remote page changes and swipe navigation both
    // funnel through `show_page`.
    let content = Node::new("content", Rect::new(0, 12, 128, 40));
    content.attach(&window).expect("fresh node must attach");
    let current = Arc::new(Mutex::new(PageKind::Home));
    build_page(PageKind::Home)
        .attach(&content)
        .expect("fresh node must attach");

    let show_page = {
        let content = Arc::downgrade(&content);
        let current = Arc::clone(&current);
        move |kind: PageKind| {
            let Some(content) = content.upgrade() else {
                return;
            };
            let mut shown = current.lock().expect("page state mutex");
            if *shown == kind {
                return;
            }
            if let Some(old) = content.child_at(0) {
                match old.detach() {
                    Ok(old) => drop(old),
                    Err(error) => tracing::warn!(%error, "stale page refused to detach"),
                }
            }
            if let Err(error) = build_page(kind).attach(&content) {
                tracing::warn!(%error, "page failed to attach");
                return;
            }
            *shown = kind;
            tracing::info!(page = ?kind, "page shown");
        }
    };

    {
        let show_page = show_page.clone();
        content.set_on_remote(move |_, event| {
            if let RemoteEvent::ChangePage(change) = event {
                show_page(change.page);
            }
        });
    }
    content.bind_remote(remote, ChangePage::NAME);

    {
        let show_page = show_page.clone();
        let current = Arc::clone(&current);
        let caption = Arc::downgrade(&caption);
        content.set_on_input(move |_, event| match event {
            InputEvent::SwipeClockwise(_) => {
                show_page(next_page(*current.lock().expect("page state mutex"), 1));
                true
            }
            InputEvent::SwipeAnticlockwise(_) => {
                show_page(next_page(*current.lock().expect("page state mutex"), -1));
                true
            }
            InputEvent::Click(_) => {
                tracing::info!(page = ?*current.lock().expect("page state mutex"), "click");
                true
            }
            InputEvent::DoubleClick(_) => {
                if let Some(caption) = caption.upgrade() {
                    caption.set_visible(!caption.is_visible());
                    tracing::info!(visible = caption.is_visible(), "caption toggled");
                }
                true
            }
            // Everything else bubbles up to the window.
            InputEvent::Press(_) => false,
        });
    }
    for name in [
        Press::NAME,
        Click::NAME,
        DoubleClick::NAME,
        SwipeClockwise::NAME,
        SwipeAnticlockwise::NAME,
    ] {
        content.bind_input(input, name);
    }

    // A long press anywhere returns home.
    window.set_on_input(move |_, event| {
        if matches!(event, InputEvent::Press(_)) {
            tracing::info!("press: returning home");
            show_page(PageKind::Home);
            true
        } else {
            false
        }
    });

    window
}

fn build_page(kind: PageKind) -> Arc<Node> {
    let tag = match kind {
        PageKind::Home => "page-home",
        PageKind::Weather => "page-weather",
        PageKind::Translation => "page-translation",
        PageKind::Connection => "page-connection",
        PageKind::MessageNotification => "page-messages",
    };
    Node::new(tag, Rect::new(0, 12, 128, 40))
}

fn next_page(current: PageKind, step: isize) -> PageKind {
    let index = PAGES
        .iter()
        .position(|&page| page == current)
        .unwrap_or(0) as isize;
    let len = PAGES.len() as isize;
    PAGES[((index + step).rem_euclid(len)) as usize]
}

fn spawn_link(remote: Dispatcher<RemoteEvent>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("sim-link".into())
        .spawn(move || {
            let step = |ms: u64, event: RemoteEvent| {
                thread::sleep(Duration::from_millis(ms));
                remote.publish_event(event);
            };
            step(
                30,
                BondingState {
                    phase: BondingPhase::Bonding,
                    passkey: 428_115,
                }
                .into(),
            );
            step(
                60,
                BondingState {
                    phase: BondingPhase::Bonded,
                    passkey: 0,
                }
                .into(),
            );
            step(20, ConnectionState::connected().into());
            step(
                50,
                ChangePage {
                    page: PageKind::Weather,
                }
                .into(),
            );
            step(80, UpdateMessage::new("12°C, clear over the ridge").into());
            step(90, MessageNotification.into());
            step(120, UpdateMessage::new("Liftoff at dawn. Bring gloves.").into());
            step(150, CallNotification.into());
            step(200, ConnectionState::disconnected().into());
        })
        .expect("failed to spawn link thread")
}

fn spawn_sensor(input: Dispatcher<InputEvent>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("sim-sensor".into())
        .spawn(move || {
            let gestures: [(u64, InputEvent); 6] = [
                (100, Click.into()),
                (150, SwipeClockwise.into()),
                (150, SwipeClockwise.into()),
                (200, SwipeAnticlockwise.into()),
                (150, DoubleClick.into()),
                (200, Press.into()),
            ];
            for (ms, gesture) in gestures {
                thread::sleep(Duration::from_millis(ms));
                input.publish_event(gesture);
            }
        })
        .expect("failed to spawn sensor thread")
}
