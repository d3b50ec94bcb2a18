use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio_util::sync::CancellationToken;

use crate::control::ControlMessage;
use crate::control::Controllable;
use crate::output::Output;
use crate::scheduler::ActiveSource;
use crate::scheduler::Scheduler;
use crate::settings::SettingsStore;
use crate::source::Source;

/// Renders the active source at its frame rate and applies control messages in between.
pub struct FrameTask<O> {
    output: O,
    clock: Box<dyn Source>,
    temperature: Option<Box<dyn Source>>,
    scheduler: Scheduler,
    settings: SettingsStore,
    utc_offset: time::UtcOffset,
    control: Option<Receiver<ControlMessage>>,
    cancellation_token: CancellationToken,
}

fn frame_interval(first_tick: Instant, period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval
}

async fn next_message(control: &mut Option<Receiver<ControlMessage>>) -> Option<ControlMessage> {
    match control {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

impl<O> FrameTask<O>
where
    O: Output,
{
    #[expect(clippy::too_many_arguments, reason = "Everything the loop owns")]
    pub fn new(
        output: O,
        clock: Box<dyn Source>,
        temperature: Option<Box<dyn Source>>,
        scheduler: Scheduler,
        settings: SettingsStore,
        utc_offset: time::UtcOffset,
        control: Option<Receiver<ControlMessage>>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let mut task = Self {
            output,
            clock,
            temperature,
            scheduler,
            settings,
            utc_offset,
            control,
            cancellation_token,
        };

        // defaults of absent keys are not a change worth saving
        task.sync_settings();
        task
    }

    /// Topics of every component, relative to the MQTT topic prefix.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut targets: Vec<&dyn Controllable> = Vec::with_capacity(3);
        targets.push(&self.output);
        targets.push(self.clock.as_ref());
        if let Some(temperature) = self.temperature.as_deref() {
            targets.push(temperature);
        }
        crate::control::subscriptions(targets)
    }

    fn active_source(&mut self) -> &mut dyn Source {
        match (self.scheduler.active(), self.temperature.as_deref_mut()) {
            (ActiveSource::Temperature, Some(temperature)) => temperature,
            _ => self.clock.as_mut(),
        }
    }

    pub async fn run(mut self) -> Result<(), crate::error::Error> {
        let period = self.active_source().frame_rate().period();
        let mut render_interval = frame_interval(Instant::now(), period);

        loop {
            tokio::select! {
                _ = render_interval.tick() => {
                    let now = Instant::now();
                    if self.scheduler.advance(now).is_some() {
                        let source = self.active_source();
                        let period = source.frame_rate().period();
                        tracing::info!(source = source.name(), ?period, "Source took over the display");

                        // this tick renders the first frame of the new source
                        render_interval = frame_interval(now + period, period);
                    }
                    self.frame().await;
                }

                message = next_message(&mut self.control) => {
                    let Some(message) = message else {
                        tracing::warn!("Control channel closed, settings are fixed from now on");
                        self.control = None;
                        continue;
                    };
                    self.handle_control_message(message).await;
                }

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Ending render loop");
                    break;
                }

                _ctrl_c = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, shutting down");
                    self.cancellation_token.cancel();
                    break
                }
            }
        }

        Ok(())
    }

    /// Renders the active source and paints the result.
    pub async fn frame(&mut self) {
        let now = time::OffsetDateTime::now_utc().to_offset(self.utc_offset);

        let source = self.active_source();
        source.refresh().await;
        let buffer = source.render(now);

        if let Err(error) = self.output.write(buffer) {
            tracing::warn!(?error, "Failed to hand frame to output");
        } else if let Err(error) = self.output.paint() {
            tracing::warn!(?error, "Failed to paint frame");
        }

        // a refresh may confirm settings that were pending
        self.persist_changes().await;
    }

    pub async fn handle_control_message(&mut self, message: ControlMessage) {
        tracing::debug!(topic = ?message.topic, payload = ?message.payload, "Control message");

        let mut targets: Vec<&mut dyn Controllable> = Vec::with_capacity(3);
        targets.push(&mut self.output);
        targets.push(self.clock.as_mut());
        if let Some(temperature) = self.temperature.as_deref_mut() {
            targets.push(temperature);
        }

        match crate::control::route(targets, &message) {
            Ok(section) => {
                tracing::debug!(?section, "Control message accepted");
                self.persist_changes().await;
            }
            Err(error) => {
                tracing::warn!(?error, topic = ?message.topic, "Dropping control message");
            }
        }
    }

    /// Merges the persisted form of every component into the store, returns whether anything changed.
    fn sync_settings(&mut self) -> bool {
        let mut sections = vec![
            (self.output.section(), self.output.persisted()),
            (self.clock.section(), self.clock.persisted()),
        ];
        if let Some(temperature) = self.temperature.as_deref() {
            sections.push((temperature.section(), temperature.persisted()));
        }

        let mut changed = false;
        for (name, section) in sections {
            changed |= self.settings.merge_section(name, section);
        }
        changed
    }

    async fn persist_changes(&mut self) {
        if !self.sync_settings() {
            return;
        }

        if let Err(error) = self.settings.save().await {
            tracing::warn!(?error, "Failed to save settings");
        }
    }
}
