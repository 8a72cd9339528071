//! Line-oriented interactive decider

use super::resolver::{
    ConflictKind, DecisionProvider, EntityConflict, FieldChoice, FieldConflict, FieldResolution,
    ResolutionChoice, ResolveError,
};
use std::io::{BufRead, Write};

/// Asks a human for every decision over a reader/writer pair
///
/// End of input aborts the resolution.
pub struct PromptDecider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptDecider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Print `question` until the answer's first letter is one of `accepted`
    fn ask(&mut self, question: &str, accepted: &[char]) -> Result<char, ResolveError> {
        loop {
            write!(self.output, "{} ", question)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(ResolveError::Aborted);
            }

            let answer = line.trim().to_ascii_lowercase();
            if let Some(c) = answer.chars().next() {
                if accepted.contains(&c) {
                    return Ok(c);
                }
            }
            writeln!(self.output, "Please answer one of: {:?}", accepted)?;
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> DecisionProvider for PromptDecider<R, W> {
    fn choose_field(
        &mut self,
        entity: &str,
        conflict: &FieldConflict,
    ) -> Result<FieldChoice, ResolveError> {
        writeln!(self.output, "  Field {}.{}", entity, conflict.summary())?;
        let answer = self.ask("  Keep [l]ocal, [r]emote or [s]kip?", &['l', 'r', 's'])?;
        Ok(match answer {
            'r' => FieldChoice::Remote,
            's' => FieldChoice::Skip,
            _ => FieldChoice::Local,
        })
    }

    fn choose_entity(
        &mut self,
        conflict: &EntityConflict,
        field_resolutions: &[FieldResolution],
    ) -> Result<ResolutionChoice, ResolveError> {
        writeln!(self.output, "{}", conflict.summary())?;

        let answer = if conflict.kind == ConflictKind::Changed {
            if !field_resolutions.is_empty() {
                writeln!(self.output, "  {} field decision(s) recorded", field_resolutions.len())?;
            }
            self.ask("Use [l]ocal, [r]emote, [m]erge or [s]kip?", &['l', 'r', 'm', 's'])?
        } else {
            self.ask("Keep [l]ocal, [r]emote or [s]kip?", &['l', 'r', 's'])?
        };

        Ok(match answer {
            'r' => ResolutionChoice::Remote,
            'm' => ResolutionChoice::Merge,
            's' => ResolutionChoice::Skip,
            _ => ResolutionChoice::Local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::resolver::ConflictResolver;
    use crate::schema::{Entity, Field, FieldType, Schema};
    use std::io::Cursor;

    fn schemas() -> (Schema, Schema) {
        let local = Schema::default()
            .with_entity(Entity::new("User").with_field(Field::new("email", FieldType::Text)))
            .with_entity(Entity::new("Post"));
        let remote = Schema::default()
            .with_entity(Entity::new("User").with_field(Field::new("email", FieldType::String)));
        (local, remote)
    }

    #[test]
    fn answers_drive_resolution() {
        let (local, remote) = schemas();
        // email -> remote, User -> merge, Post -> skip
        let input = Cursor::new("remote\nm\ns\n");
        let mut decider = PromptDecider::new(input, Vec::new());

        let result = ConflictResolver::resolve(&local, &remote, &mut decider).unwrap();
        assert_eq!(result.schema.entity_names(), vec!["User"]);
        let email = result.schema.entity("User").unwrap().field("email").unwrap();
        assert_eq!(email.field_type, FieldType::String);

        let (_, output) = decider.into_inner();
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("Field User.email"));
        assert!(transcript.contains("[m]erge"));
    }

    #[test]
    fn invalid_answer_is_asked_again() {
        let (local, remote) = schemas();
        let input = Cursor::new("x\nl\n\nl\nl\n");
        let mut decider = PromptDecider::new(input, Vec::new());

        let result = ConflictResolver::resolve(&local, &remote, &mut decider).unwrap();
        assert_eq!(result.schema.entity_names(), vec!["User", "Post"]);

        let (_, output) = decider.into_inner();
        let transcript = String::from_utf8(output).unwrap();
        assert_eq!(transcript.matches("Please answer one of").count(), 2);
    }

    #[test]
    fn end_of_input_aborts() {
        let (local, remote) = schemas();
        let mut decider = PromptDecider::new(Cursor::new("l\n"), Vec::new());
        assert!(matches!(
            ConflictResolver::resolve(&local, &remote, &mut decider),
            Err(ResolveError::Aborted)
        ));
    }
}
