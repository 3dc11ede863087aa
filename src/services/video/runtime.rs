use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use super::{
    ActiveStatus, BridgeError, PlaybackState, SeekOptions, VolumeOptions,
    controller::BridgeController,
    host::SeekCompletion,
    observer::SignalObserver,
    signals::UiSignal,
};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, BridgeError>>;

/// Command from the web layer, answered over its oneshot.
pub(crate) enum Command {
    IsActive(oneshot::Sender<ActiveStatus>),
    GetState(Reply<PlaybackState>),
    Play(Reply<()>),
    Pause(Reply<()>),
    Seek(SeekOptions, Reply<()>),
    SetVolume(VolumeOptions, Reply<()>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::IsActive(_) => "isActive",
            Self::GetState(_) => "getState",
            Self::Play(_) => "play",
            Self::Pause(_) => "pause",
            Self::Seek(..) => "seek",
            Self::SetVolume(..) => "setVolume",
        }
    }
}

/// Everything that may touch bridge state, marshaled onto the main context.
pub(crate) enum MainMessage {
    Signal(UiSignal),
    ItemCheckElapsed { token: u64 },
    Command(Command),
    Observe(bool),
    Shutdown(oneshot::Sender<()>),
}

/// The single sequential context owning the observer and the controller.
pub(crate) struct MainContext {
    observer: SignalObserver,
    controller: BridgeController,
    inbox: mpsc::UnboundedReceiver<MainMessage>,
}

impl MainContext {
    pub(crate) fn new(
        observer: SignalObserver,
        controller: BridgeController,
        inbox: mpsc::UnboundedReceiver<MainMessage>,
    ) -> Self {
        Self {
            observer,
            controller,
            inbox,
        }
    }

    /// Processes messages until shutdown or until every sender is gone.
    #[instrument(name = "video_main_context", skip(self))]
    pub(crate) async fn run(mut self) {
        info!("Video bridge main context started");

        let done = loop {
            tokio::select! {
                biased;
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        break None;
                    };
                    if let MainMessage::Shutdown(done) = message {
                        break Some(done);
                    }
                    self.handle(message);
                }
                update = self.controller.next_update() => {
                    self.controller.on_playback(update);
                }
            }
        };

        self.observer.set_observing(false);
        self.observer.reset();
        self.controller.teardown();
        info!("Video bridge main context stopped");

        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn handle(&mut self, message: MainMessage) {
        match message {
            MainMessage::Signal(signal) => {
                if let Some(detection) = self.observer.handle(signal) {
                    self.controller.apply(detection);
                }
            }
            MainMessage::ItemCheckElapsed { token } => {
                if let Some(detection) = self.observer.item_check_elapsed(token) {
                    self.controller.apply(detection);
                }
            }
            MainMessage::Command(command) => self.execute(command),
            MainMessage::Observe(observing) => self.observer.set_observing(observing),
            MainMessage::Shutdown(done) => {
                let _ = done.send(());
            }
        }
    }

    fn execute(&mut self, command: Command) {
        debug!(command = command.name(), "Executing command");

        let delivered = match command {
            Command::IsActive(reply) => reply.send(self.controller.is_active()).is_ok(),
            Command::GetState(reply) => reply.send(self.controller.get_state()).is_ok(),
            Command::Play(reply) => reply.send(self.controller.play()).is_ok(),
            Command::Pause(reply) => reply.send(self.controller.pause()).is_ok(),
            Command::SetVolume(options, reply) => {
                reply.send(self.controller.set_volume(options)).is_ok()
            }
            Command::Seek(options, reply) => match self.controller.prepare_seek(options) {
                Ok((player, target)) => {
                    tokio::spawn(async move {
                        let result = match player.seek(target).await {
                            SeekCompletion::Finished => Ok(()),
                            SeekCompletion::Interrupted => Err(BridgeError::SeekInterrupted),
                        };
                        if reply.send(result).is_err() {
                            debug!("Seek caller went away before completion");
                        }
                    });
                    true
                }
                Err(e) => reply.send(Err(e)).is_ok(),
            },
        };

        if !delivered {
            warn!("Command caller went away before the reply");
        }
    }
}
