//! Headless review driver.
//!
//! `vxt-review [--config PATH] [SUBSET]` lists the available subsets, or
//! walks every sequence of SUBSET once and logs what was loaded for it.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use vxt::service::HttpDataService;
use vxt::{AppConfig, Message, ReviewSession, ServiceWorker};

struct Args {
    config: Option<PathBuf>,
    subset: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        subset: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            _ if args.subset.is_none() => args.subset = Some(arg),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }
    Ok(args)
}

/// Apply responses until nothing is in flight.
fn pump(session: &mut ReviewSession<ServiceWorker>, timeout: Duration) {
    while session.dispatcher().pending_count() > 0 {
        match session.dispatcher_mut().wait_one_result(timeout) {
            Some(response) => session.apply(response),
            None => {
                log::warn!("Timed out waiting for the data service");
                break;
            }
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    let level = config.preferences.log_level.to_level_filter();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str())).init();

    let service = HttpDataService::new(config.service.clone())?;
    let timeout = config.service.timeout() + Duration::from_secs(1);
    let worker = ServiceWorker::spawn(Box::new(service))?;
    let mut session = ReviewSession::new(&config, worker);
    // Walking a subset must not write anything back
    session.update(Message::SetAutosave(false));

    session.start();
    pump(&mut session, timeout);

    let Some(subset) = args.subset else {
        for name in session.subsets() {
            println!("{name}");
        }
        return Ok(());
    };

    session.update(Message::LoadSubset(subset.clone()));
    pump(&mut session, timeout);
    if session.navigator().subset_name() != Some(subset.as_str()) {
        return Err(format!("could not load subset '{subset}'").into());
    }

    loop {
        let sync = session.sync();
        if let Some(sequence) = sync.sequence() {
            log::info!(
                "{}: {} frames, timeseries {:?}, {} detections and {} editable boxes on the first frame",
                sequence.sequence_id(),
                sync.timestamps().len(),
                sync.timeseries(),
                session.editor().detections().len(),
                session.editor().editable_boxes().len(),
            );
        }
        let before = session.navigator().index();
        session.update(Message::NextSequence);
        if session.navigator().index() == before {
            break;
        }
        pump(&mut session, timeout);
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("vxt-review: {e}");
        std::process::exit(1);
    }
}
