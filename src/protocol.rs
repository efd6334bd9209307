//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DailyGoal, Level, Message, SettingsPatch, Settings, SkillState, SpeechRate};
use crate::scorer::strip_diacritics;
use crate::seeds::SUPPORTED_LANGUAGES;
use crate::session::{AttemptOutcome, Phase, Session};
use crate::catalogue::Catalogue;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetSession,
    Next,
    Simplify,
    SubmitAttempt {
        transcript: String,
    },
    StartRecording,
    RecordingResult {
        transcript: String,
    },
    RecordingFailed {
        message: String,
    },
    CancelRecording,
    TranscribeAudio {
        #[serde(rename = "audioBase64")]
        audio_base64: String,
        mime: String,
    },
    Speak {
        #[serde(default)]
        slow: Option<bool>,
    },
    SetLanguage {
        language: String,
    },
    SetScenario {
        scenario: String,
    },
    /// Partial update; the settings fields sit next to `type`.
    SaveSettings(SettingsPatch),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionOut,
    },
    Presented(PresentedOut),
    AttemptResult(AttemptOut),
    RecordingStarted,
    RecordingCancelled,
    Audio(SpeakOut),
    Settings(SettingsOut),
    Error {
        message: String,
        transient: bool,
    },
}

/// Chat message as shown to the learner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOut {
    #[serde(flatten)]
    pub message: Message,
    /// `text` with diacritics stripped when the learner turned them off.
    pub display_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_label: Option<&'static str>,
}

pub fn message_out(m: &Message, settings: &Settings) -> MessageOut {
    let display_text = if settings.show_diacritics { m.text.clone() } else { strip_diacritics(&m.text) };
    MessageOut { message: m.clone(), display_text, level_label: m.level.map(Level::label) }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoalOut {
    pub completed: u32,
    pub target: u32,
    pub remaining: u32,
}

impl From<DailyGoal> for DailyGoalOut {
    fn from(g: DailyGoal) -> Self {
        DailyGoalOut { completed: g.completed, target: g.target, remaining: g.remaining() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOut {
    pub skill_score: u8,
    pub level: Level,
    pub level_label: &'static str,
    pub streak_days: u32,
    pub daily_goal: DailyGoalOut,
}

impl From<SkillState> for SkillOut {
    fn from(s: SkillState) -> Self {
        SkillOut {
            skill_score: s.skill_score,
            level: s.level,
            level_label: s.level.label(),
            streak_days: s.streak_days,
            daily_goal: s.daily_goal.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOut {
    Idle,
    Playing,
    Recording,
}

impl From<Phase> for PhaseOut {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Idle => PhaseOut::Idle,
            Phase::Playing => PhaseOut::Playing,
            Phase::Recording => PhaseOut::Recording,
        }
    }
}

/// Full session snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub id: Uuid,
    pub scenario: String,
    pub scenario_name: String,
    pub language: String,
    pub phase: PhaseOut,
    pub settings: Settings,
    pub skill: SkillOut,
    pub messages: Vec<MessageOut>,
}

pub fn session_out(s: &Session) -> SessionOut {
    let settings = s.settings();
    let scenario_name = s
        .catalogue()
        .scenarios()
        .iter()
        .find(|sc| sc.id == s.scenario_id())
        .map(|sc| sc.name.clone())
        .unwrap_or_else(|| s.scenario_id().to_string());
    SessionOut {
        id: s.id(),
        scenario: s.scenario_id().to_string(),
        scenario_name,
        language: s.language().to_string(),
        phase: s.phase().into(),
        settings,
        skill: s.skill().into(),
        messages: s.messages().iter().map(|m| message_out(m, &settings)).collect(),
    }
}

/// A newly presented sentence, with audio when auto-play produced it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedOut {
    pub message: MessageOut,
    pub skill: SkillOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<SpeakOut>,
    /// Transient notice, e.g. auto-play skipped because TTS is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOut {
    pub message: MessageOut,
    pub score: u8,
    pub skill: SkillOut,
    pub level_changed: bool,
}

pub fn attempt_out(o: &AttemptOutcome, settings: &Settings) -> AttemptOut {
    AttemptOut {
        message: message_out(&o.message, settings),
        score: o.score,
        skill: o.skill.into(),
        level_changed: o.level_changed(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakOut {
    pub audio_base64: String,
    pub mime: String,
    pub rate: SpeechRate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOut {
    pub settings: Settings,
    pub daily_goal: DailyGoalOut,
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionIn {
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Deserialize)]
pub struct AttemptIn {
    pub transcript: String,
}

#[derive(Deserialize)]
pub struct TranscribeIn {
    #[serde(rename = "audioBase64")]
    pub audio_base64: String,
    pub mime: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeakIn {
    #[serde(default)]
    pub slow: Option<bool>,
}

#[derive(Deserialize)]
pub struct LanguageIn {
    pub language: String,
}

#[derive(Deserialize)]
pub struct ScenarioIn {
    pub scenario: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOut {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_level: Option<Level>,
}

pub fn scenarios_out(c: &Catalogue) -> Vec<ScenarioOut> {
    c.scenarios()
        .iter()
        .map(|sc| ScenarioOut {
            id: sc.id.clone(),
            name: sc.name.clone(),
            icon: sc.icon.clone(),
            max_level: c.max_level(&sc.id),
        })
        .collect()
}

#[derive(Serialize)]
pub struct LanguageOut {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

pub fn languages_out() -> Vec<LanguageOut> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|&(code, name, flag)| LanguageOut { code, name, flag })
        .collect()
}

#[derive(Serialize)]
pub struct LevelOut {
    pub level: Level,
    pub label: &'static str,
}

pub fn levels_out() -> Vec<LevelOut> {
    Level::all().map(|level| LevelOut { level, label: level.label() }).collect()
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session_with;

    #[test]
    fn client_messages_parse() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"submit_attempt","transcript":"buna ziua"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SubmitAttempt { transcript } if transcript == "buna ziua"));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"speak"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Speak { slow: None }));

        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"save_settings","showDiacritics":false,"dailyGoalTarget":20}"#).unwrap();
        match m {
            ClientWsMessage::SaveSettings(patch) => {
                assert_eq!(patch.show_diacritics, Some(false));
                assert_eq!(patch.daily_goal_target, Some(20));
                assert_eq!(patch.auto_play, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hidden_diacritics_only_change_display_text() {
        let mut s = session_with(45, 0);
        s.present_next().unwrap();
        let off = Settings { show_diacritics: false, ..Settings::default() };
        let m = &s.messages()[0];
        let out = message_out(m, &off);
        assert_eq!(out.display_text, strip_diacritics(&m.text));
        assert_eq!(out.message.text, m.text);
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["role"], "bot");
        assert!(v.get("displayText").is_some());
        assert!(v.get("levelLabel").is_some());
    }

    #[test]
    fn session_snapshot_serializes() {
        let mut s = session_with(45, 0);
        s.present_next().unwrap();
        let v = serde_json::to_value(session_out(&s)).unwrap();
        assert_eq!(v["scenario"], "identification");
        assert_eq!(v["scenarioName"], "Identification");
        assert_eq!(v["phase"], "idle");
        assert_eq!(v["skill"]["skillScore"], 45);
        assert_eq!(v["skill"]["levelLabel"], "A0-A1");
        assert_eq!(v["skill"]["dailyGoal"]["remaining"], 3);
        assert_eq!(v["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn error_reply_is_tagged() {
        let v = serde_json::to_value(ServerWsMessage::Error { message: "x".into(), transient: true }).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["transient"], true);

        let mut s = session_with(45, 0);
        let p = s.present_next().unwrap();
        let out = PresentedOut {
            message: message_out(&p.message, &s.settings()),
            skill: s.skill().into(),
            audio: None,
            notice: None,
        };
        let v = serde_json::to_value(ServerWsMessage::Presented(out)).unwrap();
        assert_eq!(v["type"], "presented");
        assert_eq!(v["message"]["role"], "bot");
        assert!(v.get("audio").is_none());
    }

    #[test]
    fn catalogue_listings() {
        assert_eq!(languages_out().len(), 20);
        assert_eq!(levels_out()[5].label, "C1");
        let c = crate::catalogue::tests::builtin();
        let sc = scenarios_out(&c);
        assert_eq!(sc.len(), 9);
        assert_eq!(sc[0].max_level, Some(Level::new(3)));
    }
}
