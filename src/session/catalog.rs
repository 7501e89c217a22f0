use serde::Serialize;

use crate::api::VoiceDescriptor;

/// Voice catalog partitioned into the user's voices and AI voices,
/// each keeping the order the service listed them in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoiceCatalog {
    pub user_voices: Vec<VoiceDescriptor>,
    pub ai_voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalog {
    pub fn from_descriptors(voices: Vec<VoiceDescriptor>) -> Self {
        let (user_voices, ai_voices) = voices.into_iter().partition(|v| v.is_user_voice);
        Self {
            user_voices,
            ai_voices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_voices.is_empty() && self.ai_voices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.user_voices.len() + self.ai_voices.len()
    }

    /// User voices first, then AI voices
    pub fn iter(&self) -> impl Iterator<Item = &VoiceDescriptor> {
        self.user_voices.iter().chain(self.ai_voices.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, user: bool) -> VoiceDescriptor {
        VoiceDescriptor {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            is_user_voice: user,
        }
    }

    #[test]
    fn test_partition_preserves_order_within_groups() {
        let catalog = VoiceCatalog::from_descriptors(vec![
            voice("female_1", false),
            voice("user_a", true),
            voice("male_1", false),
            voice("user_b", true),
        ]);

        let ids: Vec<&str> = catalog.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["user_a", "user_b", "female_1", "male_1"]);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = VoiceCatalog::from_descriptors(Vec::new());
        assert!(catalog.is_empty());
        assert_eq!(catalog.iter().count(), 0);
    }
}
