use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    Special,
    Daily,
    Emergency,
}

impl MissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionType::Special => "special",
            MissionType::Daily => "daily",
            MissionType::Emergency => "emergency",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MissionType::Special => "Special",
            MissionType::Daily => "Daily",
            MissionType::Emergency => "Emergency",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "special" => Some(MissionType::Special),
            "daily" => Some(MissionType::Daily),
            "emergency" => Some(MissionType::Emergency),
            _ => None,
        }
    }
}

impl fmt::Display for MissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A scheduled mission. The type tag is kept as raw text so rows written
/// with a tag this client does not know still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMission {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "userId")]
    pub owner_id: i64,
}

impl ScheduledMission {
    pub fn mission_type(&self) -> Option<MissionType> {
        MissionType::parse_str(&self.kind)
    }

    pub fn label(&self) -> &str {
        match self.mission_type() {
            Some(t) => t.display_name(),
            None => &self.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduledMission {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MissionType,
    #[serde(rename = "userId")]
    pub owner_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_uses_known_type_or_raw_tag() {
        let mut m = ScheduledMission {
            id: 1,
            title: "Morning walk".into(),
            completed: false,
            kind: "daily".into(),
            owner_id: 2,
        };
        assert_eq!(m.label(), "Daily");
        m.kind = "anniversary".into();
        assert_eq!(m.mission_type(), None);
        assert_eq!(m.label(), "anniversary");
    }

    #[test]
    fn wire_names_match_table() {
        let row = serde_json::json!({
            "id": 3,
            "title": "Flowers",
            "completed": true,
            "type": "special",
            "userId": 8
        });
        let m: ScheduledMission = serde_json::from_value(row).unwrap();
        assert_eq!(m.owner_id, 8);
        assert_eq!(m.mission_type(), Some(MissionType::Special));

        let create = CreateScheduledMission {
            title: "Call mom".into(),
            kind: MissionType::Emergency,
            owner_id: 8,
        };
        let json = serde_json::to_value(create).unwrap();
        assert_eq!(json["type"], "emergency");
        assert_eq!(json["userId"], 8);
    }
}
