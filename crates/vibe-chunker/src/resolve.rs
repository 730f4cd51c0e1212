use vibe_core::ChunkKind;

/// A declaration found by a pattern, before overlap resolution.
///
/// Line numbers are 0-indexed and inclusive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub kind: ChunkKind,
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub parent: Option<String>,
}

impl Candidate {
    fn span(&self) -> usize {
        self.end - self.start
    }
}

/// Which accepted candidates claim their lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coverage {
    /// Every accepted block covers its lines; anything starting on a covered
    /// line is dropped.
    EveryBlock,
    /// Only classes cover lines, and coverage only drops plain functions.
    ClassesOnly,
}

/// Order candidates by start line (longest first on ties, pattern order
/// after that) and drop the ones that start inside an accepted block.
pub(crate) fn resolve_overlaps(
    mut candidates: Vec<Candidate>,
    line_count: usize,
    coverage: Coverage,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.span().cmp(&a.span())));

    let mut covered = vec![false; line_count.max(1)];
    let mut accepted = Vec::new();
    for candidate in candidates {
        let on_covered = covered.get(candidate.start).copied().unwrap_or(false);
        let claims = match coverage {
            Coverage::EveryBlock => {
                if on_covered {
                    continue;
                }
                true
            }
            Coverage::ClassesOnly => {
                if on_covered && candidate.kind == ChunkKind::Function {
                    continue;
                }
                candidate.kind == ChunkKind::Class
            }
        };
        if claims {
            let end = candidate.end.min(covered.len() - 1);
            if candidate.start <= end {
                for line in &mut covered[candidate.start..=end] {
                    *line = true;
                }
            }
        }
        accepted.push(candidate);
    }
    accepted
}
