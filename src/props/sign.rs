use crate::schema::config::SignConfig;
use crate::schema::effect::Effect;

/// A readable sign. Always interactable.
#[derive(Debug, Clone)]
pub struct Sign {
    name: String,
    text: String,
    player_nearby: bool,
}

impl Sign {
    pub fn from_config(config: &SignConfig) -> Self {
        Self {
            name: config.name.clone(),
            text: config.text.clone(),
            player_nearby: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_player_nearby(&mut self, nearby: bool, out: &mut Vec<Effect>) {
        if self.player_nearby != nearby {
            self.player_nearby = nearby;
            out.push(Effect::SetHighlight {
                prop: self.name.clone(),
                highlighted: nearby,
            });
        }
    }

    /// Queue the sign's text. A blank sign says nothing.
    pub fn read(&self, out: &mut Vec<Effect>) {
        if !self.text.trim().is_empty() {
            out.push(Effect::ShowDialogue(self.text.clone()));
        }
    }

    pub fn reset(&mut self) {
        self.player_nearby = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_highlights_and_reads() {
        let mut sign = Sign::from_config(&ron::from_str("(name: \"sign\")").unwrap());
        let mut out = Vec::new();
        sign.set_player_nearby(true, &mut out);
        sign.set_player_nearby(true, &mut out);
        assert_eq!(out.len(), 1);

        out.clear();
        sign.read(&mut out);
        assert_eq!(
            out,
            vec![Effect::ShowDialogue(
                "Welcome to the adventure! Press F to interact with objects.".into()
            )]
        );
    }

    #[test]
    fn blank_sign_reads_nothing() {
        let sign = Sign::from_config(&ron::from_str("(name: \"sign\", text: \"  \")").unwrap());
        let mut out = Vec::new();
        sign.read(&mut out);
        assert!(out.is_empty());
    }
}
