use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A TextSynth engine identifier.
///
/// Which engines are accepted depends on the
/// [`ServiceVariant`](crate::types::ServiceVariant) being talked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Model {
    /// GPT-J 6B
    #[default]
    GptJ6B,

    /// Boris 6B (French)
    Boris6B,

    /// Fairseq GPT 13B
    FairseqGpt13B,

    /// GPT-2 345M
    Gpt2Medium,

    /// GPT-2 1558M
    Gpt2Xl,
}

impl Model {
    /// The engine name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Model::GptJ6B => "gptj_6B",
            Model::Boris6B => "boris_6B",
            Model::FairseqGpt13B => "fairseq_gpt_13B",
            Model::Gpt2Medium => "gpt2_345M",
            Model::Gpt2Xl => "gpt2_1558M",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gptj_6B" => Ok(Model::GptJ6B),
            "boris_6B" => Ok(Model::Boris6B),
            "fairseq_gpt_13B" => Ok(Model::FairseqGpt13B),
            "gpt2_345M" => Ok(Model::Gpt2Medium),
            "gpt2_1558M" => Ok(Model::Gpt2Xl),
            _ => Err(Error::validation(
                format!("unknown model {s:?}"),
                Some("model".to_string()),
            )),
        }
    }
}

/// Render model names as `a`, `a or b`, or `a, b, or c`, sorted by name.
pub fn list_models(models: &[Model]) -> String {
    let mut names: Vec<&str> = models.iter().map(Model::name).collect();
    names.sort_unstable();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for model in [
            Model::GptJ6B,
            Model::Boris6B,
            Model::FairseqGpt13B,
            Model::Gpt2Medium,
            Model::Gpt2Xl,
        ] {
            assert_eq!(model.name().parse::<Model>().unwrap(), model);
        }
    }

    #[test]
    fn unknown_model_is_validation_error() {
        let err = "gpt5".parse::<Model>().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.param(), Some("model"));
    }

    #[test]
    fn list_models_formats() {
        assert_eq!(list_models(&[]), "");
        assert_eq!(list_models(&[Model::GptJ6B]), "gptj_6B");
        assert_eq!(
            list_models(&[Model::GptJ6B, Model::Boris6B]),
            "boris_6B or gptj_6B"
        );
        assert_eq!(
            list_models(&[Model::GptJ6B, Model::FairseqGpt13B, Model::Boris6B]),
            "boris_6B, fairseq_gpt_13B, or gptj_6B"
        );
    }
}
