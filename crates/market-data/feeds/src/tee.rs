//! Stream duplication

use bus::Shutdown;
use tokio::sync::mpsc;
use tracing::debug;

/// Duplicate `input` into two streams
///
/// Each item is delivered to the first output, then the second, so both see
/// the input order. Delivery waits for slow readers. A reader that goes away
/// stops receiving while the other keeps its full stream. Both outputs close
/// when the input closes, when both readers are gone, or on shutdown.
pub fn tee<T>(
    mut input: mpsc::Receiver<T>,
    capacity: usize,
    shutdown: Shutdown,
) -> (mpsc::Receiver<T>, mpsc::Receiver<T>)
where
    T: Clone + Send + 'static,
{
    let (first_tx, first_rx) = mpsc::channel(capacity.max(1));
    let (second_tx, second_rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut outputs = [Some(first_tx), Some(second_tx)];

        while outputs.iter().any(Option::is_some) {
            let item = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                item = input.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            for (index, slot) in outputs.iter_mut().enumerate() {
                let Some(tx) = slot else {
                    continue;
                };
                let sent = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => None,
                    sent = tx.send(item.clone()) => Some(sent.is_ok()),
                };
                match sent {
                    None => {
                        debug!("Tee stopped by shutdown");
                        return;
                    }
                    Some(false) => {
                        debug!(output = index, "Tee reader gone");
                        *slot = None;
                    }
                    Some(true) => {}
                }
            }
        }
        debug!("Tee stopped");
    });

    (first_rx, second_rx)
}
