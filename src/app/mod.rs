//! Top-level clock controller.
//!
//! `ClockApp` owns every state machine and the injected collaborators. The
//! board calls [`ClockApp::poll`] from its main loop with the latest line
//! samples; the app updates its state, writes the display buffer and may
//! hand back a [`Request`] the board must carry out (restart, networking).

use crate::alarm::{AlarmEngine, ToneCommand};
use crate::config::{ClockConfig, BOOT_SETTLE_US, MESSAGE_DISPLAY_SECS, MODEL_RESTART_DELAY_MS};
use crate::display::render::{render, Frame, RenderOptions};
use crate::display::sequencer::SequencerInputs;
use crate::display::{DisplayBuffer, DisplayMode, Message, Sequencer};
use crate::editor::{Commit, Editor};
use crate::emulation::{boot_gesture, BootGesture, Emulation, Model};
use crate::gestures::{OtaSession, ToggleWindow};
use crate::storage::{ByteStore, PersistedState};
use crate::switches::{MainsDetector, MuxReader, SwitchId};
use crate::time::{
    backup_valid, seed_from_backup, store_backup, AlarmSlot, BackupClock, DateTime, SyncAction,
    SyncSupervisor, TimeSource,
};
use crate::timing::PulseGenerator;
use crate::tone::{ToneOutput, Waveform};
use crate::touch::TouchInterpreter;


/// Line samples for one main-loop pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    /// `(phase, line_a, line_b)`, or `None` when the scan moved mid-sample.
    pub scan: Option<(usize, bool, bool)>,
    pub hold: bool,
    pub mains: bool,
    /// Capacitive pad reading, on boards that have one.
    pub touch_raw: Option<u16>,
}

/// Work the board has to do on the app's behalf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    Restart,
    /// Raise the update access point and listener.
    EnterOta,
    /// Tear the OTA session down and restore station mode.
    ExitOta,
    /// Run an NTP exchange now.
    Resync,
    /// Tear down and rebuild the network stack.
    ResetNetwork,
}

pub struct ClockApp<'d, T, B, S, O> {
    display: &'d DisplayBuffer,
    time: T,
    backup: B,
    store: S,
    tone: O,

    config: ClockConfig,
    persisted: PersistedState,

    switches: MuxReader,
    mains: MainsDetector,
    pulses: PulseGenerator,
    editor: Editor,
    alarm: AlarmEngine,
    sequencer: Sequencer,
    touch: TouchInterpreter,
    restart_window: ToggleWindow,
    ota: OtaSession,
    sync: SyncSupervisor,

    now: DateTime,
    boot_us: u64,
    booted: bool,
    backup_ok: bool,
    auto_date: bool,
    date_set: bool,
    restart_at_us: Option<u64>,
}

impl<'d, T, B, S, O> ClockApp<'d, T, B, S, O>
where
    T: TimeSource,
    B: BackupClock,
    S: ByteStore,
    O: ToneOutput,
{
    /// Load persisted state, reconcile the clocks and prepare the tone.
    pub fn new(
        display: &'d DisplayBuffer,
        mut time: T,
        mut backup: B,
        mut store: S,
        mut tone: O,
        config: ClockConfig,
        now_us: u64,
    ) -> Self {
        let persisted = PersistedState::load(&mut store);
        let info = persisted.info;
        info!("App: booting {:?}", info);

        let backup_ok = seed_from_backup(&mut time, &mut backup);
        let time_known = backup_ok || (!info.is_hardware() && !time.is_stale());

        let mut alarm = AlarmEngine::new();
        if info.is_hardware() {
            match backup.alarm(AlarmSlot::One) {
                Ok(Some(dt)) => alarm.set_time(dt.hour, dt.minute),
                Ok(None) => {}
                Err(e) => warn!("App: alarm slot read failed: {:?}", e),
            }
        }

        match Waveform::for_frequency(info.tone_hz()).and_then(|w| tone.load(&w)) {
            Ok(()) => debug!("App: tone {} Hz loaded", info.tone_hz()),
            Err(e) => warn!("App: tone setup failed: {:?}", e),
        }

        let now = time.now().unwrap_or_default();

        Self {
            display,
            time,
            backup,
            store,
            tone,
            config,
            persisted,
            switches: MuxReader::new(),
            mains: MainsDetector::new(!persisted.mains_detector_disabled),
            pulses: PulseGenerator::new(),
            editor: Editor::new(time_known),
            alarm,
            sequencer: Sequencer::new(),
            touch: TouchInterpreter::new(config.touch_threshold),
            restart_window: ToggleWindow::new(),
            ota: OtaSession::new(),
            sync: SyncSupervisor::new(),
            now,
            boot_us: now_us,
            booted: false,
            backup_ok,
            auto_date: true,
            date_set: false,
            restart_at_us: None,
        }
    }

    /// One main-loop pass.
    pub fn poll(&mut self, now_us: u64, inputs: &Inputs) -> Option<Request> {
        self.switches.begin_cycle();
        if let Some((phase, a, b)) = inputs.scan {
            self.switches.sample_phase(phase, a, b, now_us);
        }
        self.switches.sample_direct(SwitchId::Hold, inputs.hold, now_us);
        self.mains.sample(inputs.mains, now_us);

        self.refresh_now();
        let pulses = self.pulses.update(self.now.second, now_us);

        if let Some(at) = self.restart_at_us {
            if now_us >= at {
                return Some(self.request_restart(now_us));
            }
            self.render(now_us);
            return None;
        }

        if !self.booted {
            if now_us.saturating_sub(self.boot_us) < BOOT_SETTLE_US {
                self.render(now_us);
                return None;
            }
            self.booted = true;
            if let Some(req) = self.apply_boot_gesture(now_us) {
                return Some(req);
            }
            let info = self.persisted.info;
            if info.is_hardware() && !info.needs_model() && !self.backup_ok {
                warn!("App: RTC not trusted, time must be set");
                self.editor.enter_time(&self.now, false, true);
            }
        }

        if self.switches.pressed_edge(SwitchId::TimeSet) && self.restart_window.record(now_us) {
            warn!("App: restart gesture");
            return Some(self.request_restart(now_us));
        }

        let info = self.persisted.info;
        if info.needs_model() {
            if !self.editor.is_editing() {
                self.editor.enter_model();
                self.inhibit_mains_blanking();
            }
            if let Some(commit) = self.editor.update(&self.switches, pulses) {
                self.apply_commit(commit, now_us);
            }
            self.render(now_us);
            return None;
        }

        let use_switch_touch = info.emulation == Emulation::Network && self.config.switch_touch;
        let touch = self
            .touch
            .update(inputs.touch_raw, &self.switches, use_switch_touch, now_us);

        let mut request = None;
        if self.editor.is_editing() {
            if let Some(commit) = self.editor.update(&self.switches, pulses) {
                self.apply_commit(commit, now_us);
            }
        } else {
            if touch.rising {
                self.sequencer
                    .touch(info.emulation, self.config.date_display_secs);
            }
            if !touch.suppress_others {
                request = self.check_entries(now_us);
                if !self.editor.is_editing() {
                    self.handle_switch_actions(use_switch_touch, touch.deferred);
                }
            }
        }

        if info.has_alarm() {
            let cmd = self.alarm.tick(self.now.seconds_of_day(), pulses);
            self.apply_tone(cmd);
        }

        if pulses.top_of_second {
            request = self.on_second(now_us).or(request);
        }

        self.render(now_us);
        request
    }

    /// The update listener saw traffic.
    pub fn ota_activity(&mut self, now_us: u64) {
        self.ota.activity(now_us / 1_000);
    }

    /// The OTA session ended. `requested` is an emulation change asked for
    /// through the update portal (honoured in hardware-faithful mode).
    pub fn finish_ota(&mut self, requested: Option<Emulation>, now_us: u64) -> Option<Request> {
        self.ota.stop();
        self.sequencer.clear_message();
        let info = self.persisted.info;
        match requested {
            Some(next) if info.is_hardware() && next != info.emulation => {
                info!("App: emulation {:?} -> {:?} via OTA", info.emulation, next);
                self.persisted.info.emulation = next;
                self.save();
                Some(self.request_restart(now_us))
            }
            _ => None,
        }
    }

    fn refresh_now(&mut self) {
        match self.time.now() {
            Ok(now) => self.now = now,
            Err(e) => debug!("App: time read failed: {:?}", e),
        }
    }

    fn request_restart(&mut self, now_us: u64) -> Request {
        self.apply_tone(Some(ToneCommand::Stop));
        self.sequencer.show_message(Message::Wait, None);
        self.render(now_us);
        Request::Restart
    }

    fn apply_boot_gesture(&mut self, now_us: u64) -> Option<Request> {
        match boot_gesture(&self.persisted.info, self.switches.held()) {
            BootGesture::None => None,
            BootGesture::ToggleEmulation => {
                let next = self.persisted.info.emulation.toggled();
                info!("App: boot gesture, emulation -> {:?}", next);
                self.persisted.info.emulation = next;
                self.save();
                Some(self.request_restart(now_us))
            }
            BootGesture::ResetModel => {
                info!("App: boot gesture, model reset");
                self.persisted.info.model = Model::Unset;
                self.persisted.mains_detector_disabled = true;
                self.save();
                if let Err(e) = self.backup.clear_alarm(AlarmSlot::Two) {
                    warn!("App: clearing RTC marker failed: {:?}", e);
                }
                Some(self.request_restart(now_us))
            }
        }
    }

    /// Model selection runs with the mains-presence blank switched off, and
    /// the choice is persisted with the model so a clock without mains
    /// sensing never comes up dark.
    fn inhibit_mains_blanking(&mut self) {
        if self.mains.is_enabled() || !self.persisted.mains_detector_disabled {
            debug!("App: mains blanking off");
            self.mains = MainsDetector::new(false);
            self.persisted.mains_detector_disabled = true;
        }
    }

    /// Editor entries and the OTA combination (outside editing).
    fn check_entries(&mut self, now_us: u64) -> Option<Request> {
        let sw = &self.switches;
        let info = self.persisted.info;

        let combo = sw.is_pressed(SwitchId::HourMonth) && sw.is_pressed(SwitchId::MinDay);
        if combo && (sw.pressed_edge(SwitchId::HourMonth) || sw.pressed_edge(SwitchId::MinDay)) {
            if self.ota.is_active() {
                return None;
            }
            self.ota.start(now_us / 1_000);
            self.sequencer.show_message(Message::Ota, None);
            return Some(Request::EnterOta);
        }

        if sw.pressed_edge(SwitchId::TimeSet) {
            let keep_seconds = sw.is_pressed(SwitchId::Hold);
            self.editor.enter_time(&self.now, keep_seconds, false);
        } else if info.is_hardware() && sw.pressed_edge(SwitchId::Hold) {
            self.editor.enter_time(&self.now, true, false);
        } else if sw.pressed_edge(SwitchId::AlarmDate) {
            if info.has_alarm() {
                self.editor.enter_alarm(self.alarm.stored());
            } else if info.auto_date_capable() {
                let today = (self.backup_ok || self.date_set).then_some(&self.now);
                self.editor.enter_date(today);
            }
        }
        None
    }

    /// With the touch heuristic on, the pair members only act once the
    /// heuristic has ruled out a touch (`deferred`).
    fn handle_switch_actions(&mut self, switch_touch: bool, deferred: Option<SwitchId>) {
        let info = self.persisted.info;
        let sw = &self.switches;
        let acted = |id: SwitchId| {
            if switch_touch {
                deferred == Some(id)
            } else {
                sw.pressed_edge(id)
            }
        };
        let enable = acted(SwitchId::AlarmEnAutoDate);
        let snooze = acted(SwitchId::SnoozeDate);

        if self.switches.pressed_edge(SwitchId::Mode12_24) {
            self.persisted.twelve_hour = !self.persisted.twelve_hour;
            info!("App: 12-hour = {}", self.persisted.twelve_hour);
            self.save();
        }

        if enable {
            if info.auto_date_capable() {
                self.auto_date = !self.auto_date;
                info!("App: auto-date = {}", self.auto_date);
            } else if info.has_alarm() {
                let cmd = self.alarm.toggle_enabled();
                self.apply_tone(cmd);
            }
        }

        if snooze {
            if info.auto_date_capable() {
                self.sequencer.show_date(self.config.date_display_secs);
            } else if info.snooze_allowed() {
                let cmd = self.alarm.snooze(self.now.seconds_of_day());
                self.apply_tone(cmd);
            }
        }
    }

    fn apply_commit(&mut self, commit: Commit, now_us: u64) {
        let hardware = self.persisted.info.is_hardware();
        match commit {
            Commit::Time {
                hour,
                minute,
                second,
            } => {
                let dt = self.now.with_time(hour, minute, second);
                if let Err(e) = self.time.set(&dt) {
                    warn!("App: time set failed: {:?}", e);
                }
                // The time source owns the calendar (weekday, month length).
                let dt = self.time.now().unwrap_or(dt);
                match store_backup(&mut self.backup, &dt) {
                    Ok(()) => self.backup_ok = true,
                    Err(e) => warn!("App: RTC write failed: {:?}", e),
                }
                self.now = dt;
            }
            Commit::Alarm { hour, minute } => {
                self.alarm.set_time(hour, minute);
                if hardware {
                    let dt = self.now.with_time(hour, minute, 0);
                    if let Err(e) = self.backup.set_alarm(AlarmSlot::One, &dt) {
                        warn!("App: RTC alarm write failed: {:?}", e);
                    }
                }
            }
            Commit::Date {
                month,
                day,
                changed,
            } => {
                if changed {
                    // AM keeps a later hour increment from rolling the day.
                    let dt = self
                        .now
                        .with_date(month, day)
                        .with_time(self.now.hour % 12, self.now.minute, self.now.second);
                    if let Err(e) = self.time.set(&dt) {
                        warn!("App: date set failed: {:?}", e);
                    }
                    let dt = self.time.now().unwrap_or(dt);
                    if let Err(e) = self.backup.adjust(&dt) {
                        warn!("App: RTC write failed: {:?}", e);
                    }
                    self.now = dt;
                    self.date_set = true;
                }
            }
            Commit::Model(model) => {
                self.persisted.info.model = model;
                self.save();
                self.sequencer.show_message(Message::Done, None);
                if let Err(e) = self.backup.clear_alarm(AlarmSlot::Two) {
                    warn!("App: clearing RTC marker failed: {:?}", e);
                }
                self.restart_at_us = Some(now_us + MODEL_RESTART_DELAY_MS * 1_000);
            }
        }
        self.sequencer.reset_to_time();
    }

    /// Housekeeping on each top-of-second edge.
    fn on_second(&mut self, now_us: u64) -> Option<Request> {
        self.sequencer.tick_second();

        if self.ota.expired(now_us / 1_000) {
            warn!("App: OTA idle timeout");
            self.ota.stop();
            self.sequencer.clear_message();
            return Some(Request::ExitOta);
        }

        let stale = self.time.is_stale();
        if !stale {
            self.editor.mark_time_known();
        }

        if self.persisted.info.emulation != Emulation::Network {
            return None;
        }

        if !stale && self.now.minute == 0 && self.now.second == 0 {
            match store_backup(&mut self.backup, &self.now) {
                Ok(()) => self.backup_ok = true,
                Err(e) => warn!("App: RTC refresh failed: {:?}", e),
            }
        }

        match self.sync.tick_second(stale)? {
            SyncAction::Resync => Some(Request::Resync),
            SyncAction::ResetNetwork => {
                self.sequencer
                    .show_message(Message::Wait, Some(MESSAGE_DISPLAY_SECS));
                Some(Request::ResetNetwork)
            }
            SyncAction::Restart => Some(self.request_restart(now_us)),
        }
    }

    fn apply_tone(&mut self, cmd: Option<ToneCommand>) {
        let result = match cmd {
            Some(ToneCommand::Start) => self.tone.play(),
            Some(ToneCommand::Stop) => self.tone.stop(),
            None => return,
        };
        if let Err(e) = result {
            warn!("App: tone output failed: {:?}", e);
        }
    }

    fn save(&mut self) {
        if let Err(e) = self.persisted.save(&mut self.store) {
            error!("App: saving settings failed: {:?}", e);
        }
    }

    fn render(&mut self, now_us: u64) {
        let info = self.persisted.info;
        let inputs = SequencerInputs {
            emulation: info.emulation,
            now: &self.now,
            editing: self.editor.is_editing(),
            mains_present: self.mains.is_present(now_us),
            auto_date: info.auto_date_capable() && self.auto_date,
            config: &self.config,
        };
        let mode = self.sequencer.evaluate(&inputs);

        let frame = Frame {
            now: &self.now,
            edit: self.editor.target().map(|t| (t, self.editor.buffer())),
            opts: RenderOptions {
                twelve_hour: self.persisted.twelve_hour,
                pm_dot: info.pm_dot(),
                alarm_dot: info.has_alarm() && self.alarm.is_enabled(),
            },
        };
        self.display.store(&render(mode, &frame));
    }

    // Read-only views (board diagnostics, tests).

    pub fn persisted(&self) -> &PersistedState {
        &self.persisted
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn alarm(&self) -> &AlarmEngine {
        &self.alarm
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.sequencer.mode()
    }

    pub fn now(&self) -> &DateTime {
        &self.now
    }

    pub fn backup_trusted(&mut self) -> bool {
        backup_valid(&mut self.backup)
    }

    pub fn time_source(&self) -> &T {
        &self.time
    }

    pub fn time_source_mut(&mut self) -> &mut T {
        &mut self.time
    }

    pub fn backup_clock(&self) -> &B {
        &self.backup
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn tone(&self) -> &O {
        &self.tone
    }

    /// A model commit is waiting out its restart delay.
    pub fn pending_restart(&self) -> bool {
        self.restart_at_us.is_some()
    }
}
