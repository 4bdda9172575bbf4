//! Timelocked governance queue.
//!
//! Proposals are ordered lists of typed admin actions. Queuing stamps
//! an eta one delay in the future; execution is open to anyone once the
//! eta passes and until the grace period runs out. The protocol facade
//! applies the actions all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_TIMELOCK_DELAY, MIN_TIMELOCK_DELAY, PROPOSAL_GRACE_PERIOD};
use crate::errors::{ProtocolError, ProtocolResult};
use crate::types::Address;

/// Typed rendering of the admin calldata a proposal carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    SupportAsset(Address),
    ApproveStrategy(Address),
    RemoveStrategy(Address),
    SetAssetDefaultStrategy(Address, Address),
    SetVaultBuffer(u128),
    SetRedeemFeeBps(u64),
    SetTrusteeFeeBps(u64),
    SetTrusteeAddress(Option<Address>),
    SetAutoAllocateThreshold(u128),
    SetRebaseThreshold(u128),
    SetStrategistAddr(Address),
    SetPriceProvider(Address),
    SetUniswapAddr(Option<Address>),
    PauseCapital,
    UnpauseCapital,
    PauseRebase,
    UnpauseRebase,
    TransferToken(Address, u128),
    WithdrawAllFromStrategy(Address),
    WithdrawAllFromStrategies,
    SetTimelockDelay(u64),
}

/// Proposal lifecycle as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Queued,
    Executed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub actions: Vec<Action>,
    pub description: String,
    pub created_at: u64,
    pub eta: Option<u64>,
    pub executed: bool,
}

/// Timelocked proposal executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Governor {
    admin: Address,
    delay: u64,
    proposals: Vec<Proposal>,
}

impl Governor {
    pub fn new(admin: Address, delay: u64) -> ProtocolResult<Self> {
        validate_delay(delay)?;
        Ok(Self {
            admin,
            delay,
            proposals: Vec::new(),
        })
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn proposal(&self, id: u64) -> ProtocolResult<&Proposal> {
        self.proposals
            .iter()
            .find(|p| p.id == id)
            .ok_or(ProtocolError::ProposalNotFound)
    }

    pub fn set_delay(&mut self, caller: Address, delay: u64) -> ProtocolResult<()> {
        if caller != self.admin {
            return Err(ProtocolError::CallerNotGovernor);
        }
        validate_delay(delay)?;
        self.delay = delay;
        Ok(())
    }

    /// Create a proposal. Admin only.
    pub fn propose(
        &mut self,
        caller: Address,
        actions: Vec<Action>,
        description: String,
        now: u64,
    ) -> ProtocolResult<u64> {
        if caller != self.admin {
            return Err(ProtocolError::CallerNotGovernor);
        }
        if actions.is_empty() {
            return Err(ProtocolError::EmptyProposal);
        }
        let id = self.proposals.len() as u64 + 1;
        self.proposals.push(Proposal {
            id,
            proposer: caller,
            actions,
            description,
            created_at: now,
            eta: None,
            executed: false,
        });
        Ok(id)
    }

    /// Queue a pending proposal, stamping its earliest execution time.
    pub fn queue(&mut self, caller: Address, id: u64, now: u64) -> ProtocolResult<u64> {
        if caller != self.admin {
            return Err(ProtocolError::CallerNotGovernor);
        }
        let delay = self.delay;
        let proposal = self.proposal_mut(id)?;
        if proposal.executed {
            return Err(ProtocolError::ProposalAlreadyExecuted);
        }
        if proposal.eta.is_some() {
            return Err(ProtocolError::ProposalAlreadyQueued);
        }
        let eta = now + delay;
        proposal.eta = Some(eta);
        Ok(eta)
    }

    pub fn state(&self, id: u64, now: u64) -> ProtocolResult<ProposalState> {
        let proposal = self.proposal(id)?;
        Ok(if proposal.executed {
            ProposalState::Executed
        } else {
            match proposal.eta {
                None => ProposalState::Pending,
                Some(eta) if now > eta + PROPOSAL_GRACE_PERIOD => ProposalState::Expired,
                Some(_) => ProposalState::Queued,
            }
        })
    }

    /// Validate execution preconditions and return the actions to
    /// apply. The caller marks the proposal executed only after every
    /// action has applied.
    pub fn begin_execute(&self, id: u64, now: u64) -> ProtocolResult<Vec<Action>> {
        let proposal = self.proposal(id)?;
        if proposal.executed {
            return Err(ProtocolError::ProposalAlreadyExecuted);
        }
        let eta = proposal.eta.ok_or(ProtocolError::ProposalNotQueued)?;
        if now < eta {
            return Err(ProtocolError::TimelockNotElapsed);
        }
        if now > eta + PROPOSAL_GRACE_PERIOD {
            return Err(ProtocolError::ProposalExpired);
        }
        Ok(proposal.actions.clone())
    }

    pub fn mark_executed(&mut self, id: u64) -> ProtocolResult<()> {
        self.proposal_mut(id)?.executed = true;
        Ok(())
    }

    fn proposal_mut(&mut self, id: u64) -> ProtocolResult<&mut Proposal> {
        self.proposals
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ProtocolError::ProposalNotFound)
    }
}

fn validate_delay(delay: u64) -> ProtocolResult<()> {
    if delay < MIN_TIMELOCK_DELAY {
        return Err(ProtocolError::DelayBelowMinimum);
    }
    if delay > MAX_TIMELOCK_DELAY {
        return Err(ProtocolError::DelayAboveMaximum);
    }
    Ok(())
}
