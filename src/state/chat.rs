use crate::state::messages::{ChatCommand, ChatResponse, ChatUpdate};
use fest_api::realtime::{ChatEvent, ChatSubscription};
use fest_api::sync::FestData;
use log::{debug, warn};
use tokio::sync::mpsc;

/// Owns the live chat room for whichever sport the chat view has open.
/// Only one room is joined at a time; opening another one leaves the first.
pub struct ChatWorker {
    data: FestData,
    username: String,
    commands: mpsc::Receiver<ChatCommand>,
    responses: mpsc::Sender<ChatResponse>,
    room: Option<ChatSubscription>,
}

enum Step {
    Command(Option<ChatCommand>),
    Event(Option<ChatEvent>),
}

impl ChatWorker {
    pub fn new(
        data: FestData,
        username: String,
        commands: mpsc::Receiver<ChatCommand>,
        responses: mpsc::Sender<ChatResponse>,
    ) -> Self {
        Self { data, username, commands, responses, room: None }
    }

    pub async fn run(mut self) {
        loop {
            let step = tokio::select! {
                cmd = self.commands.recv() => Step::Command(cmd),
                event = next_event(&mut self.room) => Step::Event(event),
            };

            match step {
                Step::Command(None) => return,
                Step::Command(Some(ChatCommand::Open { sport_id })) => self.open(sport_id).await,
                Step::Command(Some(ChatCommand::Close)) => {
                    if let Some(room) = self.room.take() {
                        debug!("left chat for {}", room.sport_id());
                    }
                }
                Step::Command(Some(ChatCommand::Send { message })) => self.send(&message).await,
                Step::Event(Some(event)) => {
                    let update = match event {
                        ChatEvent::Connected => ChatUpdate::Connected,
                        ChatEvent::Disconnected => ChatUpdate::Disconnected,
                        ChatEvent::Message(msg) => ChatUpdate::Message(msg),
                        ChatEvent::Error(e) => ChatUpdate::Error(e),
                    };
                    self.emit(update).await;
                }
                Step::Event(None) => {
                    self.emit(ChatUpdate::Disconnected).await;
                    self.room = None;
                }
            }

            if self.responses.is_closed() {
                return;
            }
        }
    }

    async fn open(&mut self, sport_id: String) {
        if self.room.as_ref().is_some_and(|r| r.sport_id() == sport_id) {
            return;
        }
        // Subscribe before reading history so nothing posted in between is missed.
        let room = self.data.subscribe_chat(&sport_id);
        self.room = Some(room);
        debug!("joined chat for {sport_id}");

        let update = match self.data.chat_history(&sport_id).await {
            Ok(history) => ChatUpdate::History(history),
            Err(e) => {
                warn!("{e}");
                ChatUpdate::Error(e.to_string())
            }
        };
        self.emit(update).await;
    }

    async fn send(&mut self, message: &str) {
        let Some(sport_id) = self.room.as_ref().map(|r| r.sport_id().to_string()) else {
            warn!("chat message dropped: no room open");
            return;
        };
        if let Err(e) = self.data.send_chat(&sport_id, &self.username, message).await {
            warn!("{e}");
            self.emit(ChatUpdate::Error(e.to_string())).await;
        }
    }

    async fn emit(&self, update: ChatUpdate) {
        let Some(sport_id) = self.room.as_ref().map(|r| r.sport_id().to_string()) else {
            return;
        };
        let _ = self.responses.send(ChatResponse { sport_id, update }).await;
    }
}

async fn next_event(room: &mut Option<ChatSubscription>) -> Option<ChatEvent> {
    match room {
        Some(room) => room.recv().await,
        None => std::future::pending().await,
    }
}
