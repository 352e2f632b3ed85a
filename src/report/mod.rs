use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlockState {
    pub state_id: String,
    pub marking: Vec<(String, u64)>, // (place_name, tokens)
    pub path: Vec<String>,           // 从初始标识出发的迁移序列
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessTrace {
    pub steps: Vec<String>,
    pub markings: Vec<Vec<(String, u64)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSpaceInfo {
    pub discovered_states: usize,
    pub deadlock_states: usize,
}

/// 合理性分析报告，`soundness` 字段即总结论。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundnessReport {
    pub workflow_net: bool,                  // 是否为工作流网
    #[serde(rename = "soundness")]
    pub sound: bool,                         // 是否合理
    pub violation: Option<String>,           // 工作流网结构问题
    pub live: bool,                          // 所有迁移均可发生
    pub never_fired: Vec<String>,            // 从未发生的迁移
    pub completion_reached: bool,            // 能否到达正常终止标识
    pub witness: Option<WitnessTrace>,       // 到达终止标识的一条路径
    pub deadlocks: Vec<DeadlockState>,       // 死锁标识
    pub deadlocked_places: Vec<String>,      // 死锁中持有 token 的库所
    pub state_space: Option<StateSpaceInfo>, // 状态空间信息
    pub analysis_time: Duration,             // 分析耗时
}

impl Default for SoundnessReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundnessReport {
    pub fn new() -> Self {
        Self {
            workflow_net: false,
            sound: false,
            violation: None,
            live: false,
            never_fired: Vec::new(),
            completion_reached: false,
            witness: None,
            deadlocks: Vec::new(),
            deadlocked_places: Vec::new(),
            state_space: None,
            analysis_time: Duration::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 写出文本报告，并在 `<path>.json` 同时保存 JSON 格式。
    pub fn save_to_file(&self, path: &str) -> std::io::Result<()> {
        use std::fs::File;
        use std::io::Write;

        let mut file = File::create(path)?;
        writeln!(file, "{}", self)?;

        let json_path = format!("{}.json", path);
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(json_path, json.as_bytes())?;

        Ok(())
    }
}

impl fmt::Display for SoundnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "工作流网合理性分析报告")?;
        writeln!(f, "分析时间: {:?}", self.analysis_time)?;
        writeln!(f, "是否为工作流网: {}", self.workflow_net)?;
        if let Some(violation) = &self.violation {
            writeln!(f, "结构问题: {}", violation)?;
            writeln!(f, "是否合理: {}", self.sound)?;
            return Ok(());
        }

        writeln!(f, "是否合理: {}", self.sound)?;
        writeln!(f, "所有迁移均可发生: {}", self.live)?;
        if !self.never_fired.is_empty() {
            writeln!(f, "从未发生的迁移: {}", self.never_fired.join(", "))?;
        }

        writeln!(f, "能否正常终止: {}", self.completion_reached)?;
        if let Some(witness) = &self.witness {
            writeln!(f, "\n终止路径:")?;
            for (step_num, step) in witness.steps.iter().enumerate() {
                writeln!(f, "  步骤 {}: {}", step_num + 1, step)?;
            }
        }

        if !self.deadlocks.is_empty() {
            writeln!(f, "\n发现 {} 个死锁标识:", self.deadlocks.len())?;
            for state in &self.deadlocks {
                writeln!(f, "\n状态ID: {}", state.state_id)?;
                if !state.marking.is_empty() {
                    writeln!(f, "标识:")?;
                    for (place, tokens) in &state.marking {
                        writeln!(f, "  {}: {}", place, tokens)?;
                    }
                }
                if !state.path.is_empty() {
                    writeln!(f, "路径: {}", state.path.join(" -> "))?;
                }
            }
            writeln!(f, "\n死锁库所: {}", self.deadlocked_places.join(" "))?;
        }

        if let Some(space_info) = &self.state_space {
            writeln!(f, "\n状态空间信息:")?;
            writeln!(f, "已发现状态数: {}", space_info.discovered_states)?;
            writeln!(f, "死锁状态数: {}", space_info.deadlock_states)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadlocked() -> SoundnessReport {
        let mut report = SoundnessReport::new();
        report.workflow_net = true;
        report.never_fired = vec!["b".into()];
        report.deadlocks = vec![DeadlockState {
            state_id: "d0".into(),
            marking: vec![("p".into(), 1)],
            path: vec!["t1 (a)".into()],
        }];
        report.deadlocked_places = vec!["p".into()];
        report
    }

    #[test]
    fn json_uses_wire_names() {
        let value: serde_json::Value =
            serde_json::from_str(&deadlocked().to_json().unwrap()).unwrap();
        assert_eq!(value["workflowNet"], true);
        assert_eq!(value["soundness"], false);
        assert_eq!(value["neverFired"][0], "b");
        assert_eq!(value["deadlockedPlaces"][0], "p");
        assert_eq!(value["deadlocks"][0]["stateId"], "d0");
    }

    #[test]
    fn display_lists_diagnostics() {
        let text = deadlocked().to_string();
        assert!(text.contains("从未发生的迁移: b"));
        assert!(text.contains("路径: t1 (a)"));
        assert!(text.contains("死锁库所: p"));
    }

    #[test]
    fn saves_text_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let path = path.to_str().unwrap();
        deadlocked().save_to_file(path).unwrap();

        let json = std::fs::read_to_string(format!("{path}.json")).unwrap();
        let back: SoundnessReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.deadlocks, deadlocked().deadlocks);
        assert!(std::fs::read_to_string(path).unwrap().contains("是否合理: false"));
    }
}
