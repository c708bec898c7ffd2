//! Turns phase and capabilities into enabled actions and commands.
//!
//! [`ActionResolver::panel`] is a single match over the phase tag and the
//! capability descriptor. Every gesture resolves to at most one
//! [`GameCommand`]; ambiguous gestures resolve to a [`ChoicePrompt`] that is
//! re-validated against the current view when the choice comes back.

use fzmahjong_tiles::{ChiCandidate, Tile, TileFace, chi_candidates};
use tracing::{debug, info, instrument};

use crate::command::GameCommand;
use crate::reconciler::Reconciler;
use crate::view::{Capabilities, Phase};

/// A user-facing action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum Action {
    /// 补花
    #[strum(serialize = "replace-flower")]
    ReplaceFlower,
    /// 开金
    #[strum(serialize = "open-gold")]
    OpenGold,
    /// Vote to play another hand.
    #[strum(serialize = "continue")]
    ContinueGame,
    /// Vote to stop.
    #[strum(serialize = "end")]
    EndGame,
    /// 胡, including the three-gold win.
    #[strum(serialize = "hu")]
    Hu,
    /// 暗杠
    #[strum(serialize = "an-gang")]
    ConcealedKong,
    /// 吃
    #[strum(serialize = "chi")]
    Chi,
    /// 碰
    #[strum(serialize = "peng")]
    Peng,
    /// 杠 on a discard.
    #[strum(serialize = "gang")]
    Kong,
    /// 过
    #[strum(serialize = "pass")]
    Pass,
}

impl Action {
    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            Self::ReplaceFlower => "补花",
            Self::OpenGold => "开金",
            Self::ContinueGame => "继续",
            Self::EndGame => "结束",
            Self::Hu => "胡",
            Self::ConcealedKong | Self::Kong => "杠",
            Self::Chi => "吃",
            Self::Peng => "碰",
            Self::Pass => "过",
        }
    }
}

/// What the action area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPanel {
    /// Nothing to do.
    Hidden,
    /// Local player's turn to replace flowers.
    ReplaceFlower,
    /// Local player is the dealer and must open the gold.
    OpenGold,
    /// Local player has not voted on continuing.
    ContinueDecision,
    /// Self-triggered options after a draw.
    SelfTurn {
        /// Win (or three-gold win) offered.
        hu: bool,
        /// Concealed kong offered with at least one candidate.
        concealed_kong: bool,
    },
    /// Reactions to another player's discard.
    DiscardReaction {
        /// The discard, when the server named it.
        discarded: Option<Tile>,
        /// Run claim offered (requires a named discard).
        chi: bool,
        /// Triplet claim offered.
        peng: bool,
        /// Open kong offered.
        kong: bool,
        /// Win offered.
        hu: bool,
    },
}

impl ActionPanel {
    /// Actions in display order.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            Self::Hidden => Vec::new(),
            Self::ReplaceFlower => vec![Action::ReplaceFlower],
            Self::OpenGold => vec![Action::OpenGold],
            Self::ContinueDecision => vec![Action::ContinueGame, Action::EndGame],
            Self::SelfTurn { hu, concealed_kong } => {
                let mut actions = Vec::with_capacity(3);
                if *hu {
                    actions.push(Action::Hu);
                }
                if *concealed_kong {
                    actions.push(Action::ConcealedKong);
                }
                actions.push(Action::Pass);
                actions
            }
            Self::DiscardReaction {
                chi, peng, kong, hu, ..
            } => [
                (*chi, Action::Chi),
                (*peng, Action::Peng),
                (*kong, Action::Kong),
                (*hu, Action::Hu),
                (true, Action::Pass),
            ]
            .into_iter()
            .filter_map(|(enabled, action)| enabled.then_some(action))
            .collect(),
        }
    }

    /// Returns true if `action` is currently shown.
    pub fn offers(&self, action: Action) -> bool {
        self.actions().contains(&action)
    }
}

/// A choice the user must make before a command can be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoicePrompt {
    /// Several runs can absorb the discard.
    Chi {
        /// The discard.
        discarded: Tile,
        /// Candidates ordered low, mid, high.
        candidates: Vec<ChiCandidate>,
    },
    /// Several faces can form a concealed kong.
    ConcealedKong {
        /// Faces in server order.
        options: Vec<TileFace>,
    },
}

impl ChoicePrompt {
    /// Number of options.
    pub fn len(&self) -> usize {
        match self {
            Self::Chi { candidates, .. } => candidates.len(),
            Self::ConcealedKong { options } => options.len(),
        }
    }

    /// Always false for prompts produced by the resolver.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a gesture was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Refusal {
    /// The action is not currently offered.
    #[display("That action is not available now")]
    NotExposed,
    /// The discard is the gold tile.
    #[display("The gold tile cannot be used for 吃")]
    GoldDiscard,
    /// The discard is a wind, dragon or flower.
    #[display("Honor tiles cannot be used for 吃")]
    HonorDiscard,
    /// No run can be formed.
    #[display("Cannot form a valid sequence")]
    NoRunCandidates,
    /// Index outside the prompt.
    #[display("No such option")]
    InvalidChoice,
}

/// Outcome of resolving a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Publish exactly this command.
    Send(GameCommand),
    /// Ask the user to pick an option.
    Choose(ChoicePrompt),
    /// The selection no longer matches the view; nothing is sent.
    Stale,
    /// Refused; nothing is sent.
    Unavailable(Refusal),
}

impl Resolution {
    /// The command to publish, if any.
    pub fn command(&self) -> Option<&GameCommand> {
        match self {
            Self::Send(command) => Some(command),
            _ => None,
        }
    }
}

/// Resolves gestures against the current view.
#[derive(Debug, Clone, Copy)]
pub struct ActionResolver<'a> {
    view: &'a Reconciler,
}

impl<'a> ActionResolver<'a> {
    /// Borrows the reconciled view.
    pub fn new(view: &'a Reconciler) -> Self {
        Self { view }
    }

    /// Computes what the action area shows.
    pub fn panel(&self) -> ActionPanel {
        let view = self.view.view();
        let my_index = self.view.my_index_among_players();
        let default_caps = Capabilities::default();
        let caps = self.view.current_capabilities().unwrap_or(&default_caps);

        match self.view.current_phase() {
            Some(Phase::ConfirmContinue) => {
                return if self.view.my_continue_decision().is_none() {
                    ActionPanel::ContinueDecision
                } else {
                    ActionPanel::Hidden
                };
            }
            Some(Phase::ReplacingFlowers)
                if view.replacing_flowers() == Some(&true)
                    && my_index.is_some()
                    && view.current_flower_player_index().copied() == my_index =>
            {
                return ActionPanel::ReplaceFlower;
            }
            Some(Phase::OpeningGold)
                if view.waiting_open_gold() == Some(&true)
                    && my_index.is_some()
                    && view.dealer_index().copied() == my_index =>
            {
                return ActionPanel::OpenGold;
            }
            _ => {}
        }

        if caps.offers_self_action() {
            ActionPanel::SelfTurn {
                hu: caps.can_hu() || caps.can_san_jin_dao(),
                concealed_kong: caps.can_an_gang() && !caps.an_gang_tiles().is_empty(),
            }
        } else if caps.offers_reaction() {
            let discarded = caps.discarded_tile().cloned();
            ActionPanel::DiscardReaction {
                chi: caps.can_chi() && discarded.is_some(),
                discarded,
                peng: caps.can_peng(),
                kong: caps.can_gang(),
                hu: caps.can_hu(),
            }
        } else {
            ActionPanel::Hidden
        }
    }

    /// Resolves a button press.
    #[instrument(skip(self))]
    pub fn select(&self, action: Action) -> Resolution {
        let panel = self.panel();
        if !panel.offers(action) {
            debug!(?panel, "Action not offered");
            return Resolution::Unavailable(Refusal::NotExposed);
        }

        let resolution = match action {
            Action::ReplaceFlower => Resolution::Send(GameCommand::ReplaceFlower),
            Action::OpenGold => Resolution::Send(GameCommand::OpenGold),
            Action::ContinueGame => Resolution::Send(GameCommand::Continue { proceed: true }),
            Action::EndGame => Resolution::Send(GameCommand::Continue { proceed: false }),
            Action::Hu => Resolution::Send(GameCommand::Hu),
            Action::Peng => Resolution::Send(GameCommand::Peng),
            Action::Kong => Resolution::Send(GameCommand::Gang),
            Action::Pass => Resolution::Send(GameCommand::Pass),
            Action::Chi => match &panel {
                ActionPanel::DiscardReaction {
                    discarded: Some(discarded),
                    ..
                } => self.resolve_chi(discarded),
                _ => Resolution::Unavailable(Refusal::NotExposed),
            },
            Action::ConcealedKong => self.resolve_concealed_kong(),
        };
        info!(?resolution, "Action resolved");
        resolution
    }

    fn resolve_chi(&self, discarded: &Tile) -> Resolution {
        let gold = self.view.gold_tile();
        if discarded.is_gold(gold) {
            return Resolution::Unavailable(Refusal::GoldDiscard);
        }
        if !discarded.kind().is_suited() {
            return Resolution::Unavailable(Refusal::HonorDiscard);
        }

        let mut candidates = chi_candidates(self.view.my_hand(), discarded, gold);
        match candidates.len() {
            0 => Resolution::Unavailable(Refusal::NoRunCandidates),
            1 => {
                let only = candidates.remove(0);
                Resolution::Send(chi_command(&only))
            }
            _ => Resolution::Choose(ChoicePrompt::Chi {
                discarded: discarded.clone(),
                candidates,
            }),
        }
    }

    fn resolve_concealed_kong(&self) -> Resolution {
        let Some(caps) = self.view.current_capabilities() else {
            return Resolution::Stale;
        };
        match caps.an_gang_tiles() {
            [] => Resolution::Unavailable(Refusal::NotExposed),
            [face] => self.kong_on_face(face),
            options => Resolution::Choose(ChoicePrompt::ConcealedKong {
                options: options.to_vec(),
            }),
        }
    }

    fn kong_on_face(&self, face: &TileFace) -> Resolution {
        match self.view.my_hand().iter().find(|t| t.shows(face)) {
            Some(tile) => Resolution::Send(GameCommand::AnGang {
                tile_id: tile.id().to_string(),
            }),
            None => {
                debug!(%face, "No hand tile for kong face");
                Resolution::Stale
            }
        }
    }

    /// Resolves the answer to an earlier prompt against the current view.
    #[instrument(skip(self, prompt), fields(options = prompt.len()))]
    pub fn choose(&self, prompt: &ChoicePrompt, index: usize) -> Resolution {
        let panel = self.panel();
        let resolution = match prompt {
            ChoicePrompt::Chi {
                discarded,
                candidates,
            } => {
                let still_offered = matches!(
                    &panel,
                    ActionPanel::DiscardReaction { discarded: Some(current), chi: true, .. }
                        if current == discarded
                );
                if !still_offered {
                    Resolution::Stale
                } else if let Some(candidate) = candidates.get(index) {
                    self.revalidate_chi(candidate)
                } else {
                    Resolution::Unavailable(Refusal::InvalidChoice)
                }
            }
            ChoicePrompt::ConcealedKong { options } => {
                let still_offered = matches!(panel, ActionPanel::SelfTurn { concealed_kong: true, .. });
                match options.get(index) {
                    _ if !still_offered => Resolution::Stale,
                    None => Resolution::Unavailable(Refusal::InvalidChoice),
                    Some(face) => match self.view.current_capabilities() {
                        Some(caps) if caps.an_gang_tiles().contains(face) => self.kong_on_face(face),
                        _ => Resolution::Stale,
                    },
                }
            }
        };
        info!(?resolution, "Choice resolved");
        resolution
    }

    /// A candidate is still valid if both tiles are in hand, unchanged and not gold.
    fn revalidate_chi(&self, candidate: &ChiCandidate) -> Resolution {
        let hand = self.view.my_hand();
        let gold = self.view.gold_tile();
        let holds = |wanted: &Tile| {
            hand.iter()
                .any(|t| t.id() == wanted.id() && t.face() == wanted.face() && !t.is_gold(gold))
        };
        if holds(&candidate.first) && holds(&candidate.second) {
            Resolution::Send(chi_command(candidate))
        } else {
            Resolution::Stale
        }
    }

    /// Discards a hand tile by id. Only during play, and never while another
    /// player's discard is waiting on a reaction.
    #[instrument(skip(self))]
    pub fn discard(&self, tile_id: &str) -> Resolution {
        let open = self.view.current_phase() == Some(Phase::Playing)
            && !matches!(self.panel(), ActionPanel::DiscardReaction { .. });
        if !open {
            debug!(phase = ?self.view.current_phase(), "Discard not allowed now");
            return Resolution::Unavailable(Refusal::NotExposed);
        }
        if self.view.my_hand().iter().any(|t| t.id() == tile_id) {
            Resolution::Send(GameCommand::Discard {
                tile_id: tile_id.to_string(),
            })
        } else {
            debug!("Tile not in hand");
            Resolution::Stale
        }
    }

    /// Declares a concealed kong directly on a hand tile.
    #[instrument(skip(self))]
    pub fn kong_with(&self, tile_id: &str) -> Resolution {
        let panel = self.panel();
        if !matches!(panel, ActionPanel::SelfTurn { concealed_kong: true, .. }) {
            debug!(?panel, "Concealed kong not offered");
            return Resolution::Unavailable(Refusal::NotExposed);
        }
        let Some(tile) = self.view.my_hand().iter().find(|t| t.id() == tile_id) else {
            return Resolution::Stale;
        };
        let eligible = self
            .view
            .current_capabilities()
            .is_some_and(|caps| caps.an_gang_tiles().contains(&tile.face()));
        if eligible {
            Resolution::Send(GameCommand::AnGang {
                tile_id: tile_id.to_string(),
            })
        } else {
            Resolution::Unavailable(Refusal::NotExposed)
        }
    }
}

fn chi_command(candidate: &ChiCandidate) -> GameCommand {
    let (first, second) = candidate.tile_ids();
    GameCommand::Chi {
        tile_id1: first.to_string(),
        tile_id2: second.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_turn_always_offers_pass() {
        let panel = ActionPanel::SelfTurn {
            hu: false,
            concealed_kong: true,
        };
        assert_eq!(panel.actions(), [Action::ConcealedKong, Action::Pass]);
    }

    #[test]
    fn test_reaction_order() {
        let panel = ActionPanel::DiscardReaction {
            discarded: None,
            chi: false,
            peng: true,
            kong: true,
            hu: true,
        };
        assert_eq!(
            panel.actions(),
            [Action::Peng, Action::Kong, Action::Hu, Action::Pass]
        );
    }

    #[test]
    fn test_action_names_parse() {
        assert_eq!("an-gang".parse::<Action>().unwrap(), Action::ConcealedKong);
        assert_eq!(Action::ReplaceFlower.to_string(), "replace-flower");
    }
}
