//! Basic example of using an emitter to notify parts of an application.
//!
//! This example demonstrates the simplest usage pattern of the emitter package:
//! registering listeners, emitting events synchronously and asynchronously, and tearing
//! the listeners down again through a composite disposer.

use std::rc::Rc;

use emitter::{CompositeDisposer, Emitter, EventKey};
use futures::executor::block_on;

/// Lifecycle of a download, each transition carrying the file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Download {
    Started,
    Finished,
}

impl EventKey for Download {
    type Payload = String;
}

fn main() {
    println!("=== Emitter Basic Example ===");

    let emitter = Emitter::new();
    let listeners = CompositeDisposer::new();

    listeners.add(Rc::new(emitter.on(Download::Started, |file: &String| {
        println!("Started downloading {file}");
    })));
    listeners.add(Rc::new(emitter.on(Download::Finished, |file: &String| {
        println!("Finished downloading {file}");
    })));

    println!("Emitting synchronously...");
    emitter.emit(&Download::Started, &"report.pdf".to_string());

    println!("Emitting asynchronously...");
    let emission = emitter.emit_async(&Download::Finished, "report.pdf".to_string());
    println!("Nothing delivered yet, awaiting the emission.");

    if let Err(error) = block_on(emission) {
        println!("Emission failed: {error}");
    }

    listeners.dispose();
    println!(
        "Listeners after teardown: started={}, finished={}",
        emitter.listener_count(&Download::Started),
        emitter.listener_count(&Download::Finished)
    );

    println!("Example completed successfully!");
}
