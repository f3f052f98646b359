//! # Cassandra .inp 输入文件读写
//!
//! Cassandra 输入由 `# Section_Name` 开头、`!----` 分隔线结束的段落组成，
//! 文件以 `END` 结尾。这里只做段落级的读取和替换，不解释段落含义。
//!
//! ```text
//! # Run_Name
//! gcmc.out
//! !------------------------------------------------------------------------------
//!
//! # Chemical_Potential_Info
//! -32.0
//! !------------------------------------------------------------------------------
//! END
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/prepare.rs`, `commands/calibrate.rs` 使用
//! - 使用 `regex` 识别段落标题

use crate::error::{CassutilError, Result};
use crate::parsers::prp::parse_fortran_float;

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const SEPARATOR: &str =
    "!------------------------------------------------------------------------------";

fn section_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#\s*([A-Za-z][A-Za-z0-9_]*)").expect("static pattern"))
}

/// Cassandra 输入文件
#[derive(Debug, Clone)]
pub struct CassandraInput {
    /// 来源路径（用于报错）
    pub path: String,
    lines: Vec<String>,
}

impl CassandraInput {
    /// 从文件读取
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CassutilError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Self::from_content(&content, &path.display().to_string()))
    }

    pub fn from_content(content: &str, path: &str) -> Self {
        CassandraInput {
            path: path.to_string(),
            lines: content.lines().map(String::from).collect(),
        }
    }

    /// 段落标题所在行
    fn header_line(&self, name: &str) -> Option<usize> {
        let re = section_header_regex();
        self.lines.iter().position(|l| {
            re.captures(l.trim())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
    }

    /// 段落正文的结束行（不含）
    fn body_end(&self, header: usize) -> usize {
        self.lines
            .iter()
            .enumerate()
            .skip(header + 1)
            .find(|(_, l)| is_body_terminator(l))
            .map(|(i, _)| i)
            .unwrap_or(self.lines.len())
    }

    /// 读取段落正文（去除空行）
    pub fn section(&self, name: &str) -> Option<Vec<String>> {
        let header = self.header_line(name)?;
        let end = self.body_end(header);
        Some(
            self.lines[header + 1..end]
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        )
    }

    /// 替换或插入段落
    pub fn set_section(&mut self, name: &str, body: &[String]) {
        match self.header_line(name) {
            Some(header) => {
                let end = self.body_end(header);
                self.lines.splice(header + 1..end, body.iter().cloned());
            }
            None => {
                let mut block = vec![format!("# {}", name)];
                block.extend(body.iter().cloned());
                block.push(SEPARATOR.to_string());
                block.push(String::new());

                let at = self
                    .lines
                    .iter()
                    .rposition(|l| l.trim().eq_ignore_ascii_case("END"))
                    .unwrap_or(self.lines.len());
                self.lines.splice(at..at, block);
            }
        }
    }

    /// 读取必需段落
    fn required_section(&self, name: &str) -> Result<Vec<String>> {
        self.section(name).ok_or_else(|| CassutilError::MissingSection {
            section: name.to_string(),
            path: self.path.clone(),
        })
    }

    /// 各可插入物种的化学势 (kJ/mol)
    pub fn chemical_potentials(&self) -> Result<Vec<f64>> {
        let body = self.required_section("Chemical_Potential_Info")?;
        body.iter()
            .flat_map(|l| l.split_whitespace())
            .map(|t| {
                parse_fortran_float(t).ok_or_else(|| CassutilError::ParseError {
                    format: "inp".to_string(),
                    path: self.path.clone(),
                    reason: format!("invalid chemical potential '{}'", t),
                })
            })
            .collect()
    }

    /// 第一个模拟盒的温度 (K)
    pub fn temperature(&self) -> Option<f64> {
        self.section("Temperature_Info")?
            .first()?
            .split_whitespace()
            .next()
            .and_then(parse_fortran_float)
    }

    /// 运行名
    pub fn run_name(&self) -> Option<String> {
        self.section("Run_Name")?.into_iter().next()
    }

    pub fn set_run_name(&mut self, run_name: &str) {
        self.set_section("Run_Name", &[run_name.to_string()]);
    }

    pub fn set_chemical_potentials(&mut self, mus: &[f64]) {
        let line = mus
            .iter()
            .map(|m| format!("{:.6}", m))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_section("Chemical_Potential_Info", &[line]);
    }

    pub fn set_seeds(&mut self, seed1: u64, seed2: u64) {
        self.set_section("Seed_Info", &[format!("{} {}", seed1, seed2)]);
    }

    /// 写入文件
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string()).map_err(|e| CassutilError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl std::fmt::Display for CassandraInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn is_body_terminator(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('!') || t.starts_with('#') || t.eq_ignore_ascii_case("END")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"! Cassandra input generated by MoSDeF
# Run_Name
gcmc.out
!------------------------------------------------------------------------------

# Sim_Type
gcmc
!------------------------------------------------------------------------------

# Temperature_Info
309.0
!------------------------------------------------------------------------------

# Chemical_Potential_Info
-33.0
!------------------------------------------------------------------------------

# Move_Probability_Info

# Prob_Translation
0.25
2.0

# Done_Probability_Info
!------------------------------------------------------------------------------

END
"#;

    #[test]
    fn test_read_sections() {
        let inp = CassandraInput::from_content(TEMPLATE, "gcmc.inp");
        assert_eq!(inp.run_name().as_deref(), Some("gcmc.out"));
        assert_eq!(inp.chemical_potentials().unwrap(), vec![-33.0]);
        assert_eq!(inp.temperature(), Some(309.0));
        assert_eq!(inp.section("prob_translation").unwrap(), vec!["0.25", "2.0"]);
    }

    #[test]
    fn test_replace_existing_section() {
        let mut inp = CassandraInput::from_content(TEMPLATE, "gcmc.inp");
        inp.set_chemical_potentials(&[-28.5]);
        inp.set_run_name("equil.out");
        assert_eq!(inp.chemical_potentials().unwrap(), vec![-28.5]);
        assert_eq!(inp.run_name().as_deref(), Some("equil.out"));

        let text = inp.to_string();
        assert_eq!(text.matches("# Chemical_Potential_Info").count(), 1);
        assert!(text.contains("# Sim_Type\ngcmc\n"));
        assert!(text.trim_end().ends_with("END"));
    }

    #[test]
    fn test_insert_missing_section_before_end() {
        let mut inp = CassandraInput::from_content(TEMPLATE, "gcmc.inp");
        inp.set_seeds(1201, 1202);
        assert_eq!(inp.section("Seed_Info").unwrap(), vec!["1201 1202"]);

        let text = inp.to_string();
        let seed_pos = text.find("# Seed_Info").unwrap();
        let end_pos = text.rfind("END").unwrap();
        assert!(seed_pos < end_pos);
    }

    #[test]
    fn test_missing_chemical_potential_section() {
        let inp = CassandraInput::from_content("# Run_Name\nx.out\nEND\n", "x.inp");
        assert!(matches!(
            inp.chemical_potentials(),
            Err(CassutilError::MissingSection { .. })
        ));
        assert_eq!(inp.temperature(), None);
    }

    #[test]
    fn test_multiple_species_chemical_potentials() {
        let inp = CassandraInput::from_content(
            "# Chemical_Potential_Info\n-30.0 -0.25D+02\n!---\nEND\n",
            "mix.inp",
        );
        assert_eq!(inp.chemical_potentials().unwrap(), vec![-30.0, -25.0]);
    }
}
