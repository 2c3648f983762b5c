//! The trigger dispatcher
//!
//! `LoanDispatcher` is the single entry point through which loans change
//! state. Every call runs the same pipeline: load the loan, look the
//! (state, trigger) pair up in the transition graph, evaluate guards,
//! run the pre-action, persist the new state, run best-effort post-actions,
//! and publish a transition event. Any failure before the persist leaves
//! the stored record untouched; failures after the persist are logged and
//! never unwind the commit.

use crate::core::graph::TransitionGraph;
use crate::core::traits::{EventSink, LoanStore, PolicyProvider, StoreError};
use crate::types::{
    ActorContext, CirculationError, Loan, LoanState, PolicyError, RejectReason, Trigger,
    TransitionEvent, TransitionParams,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

/// Orchestrates loan state transitions over pluggable collaborators
///
/// Generic over the three boundary traits so tests and hosts can swap in
/// their own storage, policy, and event transport.
pub struct LoanDispatcher<S: LoanStore, P: PolicyProvider, E: EventSink> {
    store: S,
    policy: P,
    sink: E,
    graph: TransitionGraph,
}

impl<S: LoanStore, P: PolicyProvider, E: EventSink> LoanDispatcher<S, P, E> {
    /// Create a dispatcher over the given collaborators
    pub fn new(store: S, policy: P, sink: E) -> Self {
        LoanDispatcher {
            store,
            policy,
            sink,
            graph: TransitionGraph::new(),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The policy provider
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The event sink
    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// Load a loan read-only
    ///
    /// # Errors
    /// `LoanNotFound` if no record exists for the pid.
    pub fn loan(&self, loan_pid: &str) -> Result<Loan, CirculationError> {
        let (loan, _) = self
            .store
            .load(loan_pid)
            .map_err(|e| map_store_error(loan_pid, e))?;
        Ok(loan)
    }

    /// Apply a trigger to an existing loan
    ///
    /// Runs the full transition pipeline. The returned loan reflects the
    /// committed state.
    ///
    /// # Arguments
    /// * `loan_pid` - The loan to transition
    /// * `trigger` - The requested action
    /// * `actor` - Who performs the action, forwarded to the policy
    /// * `params` - Per-call parameters (item, pickup, transaction date)
    ///
    /// # Errors
    /// * `LoanNotFound` - No record for the pid
    /// * `InvalidTransition` - The (state, trigger) pair is not in the graph
    /// * `TransitionRejected` - A guard or policy said no
    /// * `ItemNotAvailable` / `NoAvailableItem` / `MultipleLoansOnItem` -
    ///   Item-level guard failures
    /// * `Persistence` - Load/save failure; retryable on version conflict
    /// * `PolicyEvaluation` - A capability failed while being evaluated
    pub fn apply(
        &mut self,
        loan_pid: &str,
        trigger: Trigger,
        actor: &ActorContext,
        params: TransitionParams,
    ) -> Result<Loan, CirculationError> {
        let (mut loan, version) = self
            .store
            .load(loan_pid)
            .map_err(|e| map_store_error(loan_pid, e))?;
        let src = loan.state;

        let dest = self
            .graph
            .destination(src, trigger)
            .ok_or_else(|| CirculationError::invalid_transition(loan_pid, src, trigger))?;

        self.check_trigger_permitted(actor, &loan, trigger)?;

        let now = params.transaction_date.unwrap_or_else(Utc::now);
        match (src, trigger) {
            (LoanState::Pending, Trigger::Checkout) => {
                self.prepare_checkout(&mut loan, &params, now)?
            }
            (LoanState::Pending, Trigger::Validate) => {
                self.prepare_validate(&mut loan, &params)?
            }
            (LoanState::ItemInTransitForPickup, Trigger::Deliver) => {
                self.prepare_deliver(&mut loan, now)?
            }
            (LoanState::ItemOnLoan, Trigger::Extend) => self.prepare_extend(&mut loan, now)?,
            (LoanState::ItemOnLoan, Trigger::Checkin) => {
                self.prepare_checkin(&mut loan, &params, now)?
            }
            // cancel, transit check-in and receive carry no pre-action
            _ => {}
        }

        loan.state = dest;
        self.store
            .save(&loan, version)
            .map_err(|e| map_store_error(loan_pid, e))?;
        debug!(
            loan = %loan.pid,
            from = %src,
            to = %dest,
            trigger = %trigger,
            "transition committed"
        );

        self.run_post_actions(&loan, src, trigger);
        self.emit(&loan, src, trigger, now);
        Ok(loan)
    }

    /// Create a loan in `PENDING` from a patron request
    ///
    /// This is the creation half of the `request` trigger; it never touches
    /// the transition graph and emits no event. When the request names an
    /// item and no pickup location, the item's home location becomes the
    /// pickup location.
    ///
    /// # Errors
    /// * `TransitionRejected(TriggerNotPermitted)` - Actor may not request
    /// * `RecordCannotBeRequested` - The request policy refused the document
    /// * `Persistence` - The pid already exists or the store failed
    pub fn request(
        &mut self,
        loan_pid: &str,
        patron_pid: &str,
        document_pid: &str,
        actor: &ActorContext,
        params: TransitionParams,
    ) -> Result<Loan, CirculationError> {
        let mut loan = Loan::new(loan_pid, patron_pid, document_pid, LoanState::Pending);
        let now = params.transaction_date.unwrap_or_else(Utc::now);
        loan.request_date = Some(now);

        self.check_trigger_permitted(actor, &loan, Trigger::Request)?;

        let requestable = self
            .policy
            .can_be_requested(&loan)
            .map_err(|e| map_policy_error(loan_pid, e))?;
        if !requestable {
            return Err(CirculationError::record_cannot_be_requested(
                loan_pid,
                document_pid,
            ));
        }

        loan.item_pid = params.item_pid.clone();
        let pickup = match (&params.pickup_location_pid, &loan.item_pid) {
            (Some(pickup), _) => Some(pickup.clone()),
            (None, Some(item)) => self
                .policy
                .item_location(item)
                .map_err(|e| map_policy_error(loan_pid, e))?,
            (None, None) => None,
        };
        if pickup.is_some() || params.delivery_method.is_some() {
            loan.delivery = Some(crate::types::DeliveryInfo {
                method: params.delivery_method.clone(),
                pickup_location_pid: pickup,
            });
        }

        self.store
            .create(&loan)
            .map_err(|e| map_store_error(loan_pid, e))?;
        debug!(loan = %loan.pid, document = %loan.document_pid, "request created");
        Ok(loan)
    }

    /// Create a loan directly in `ITEM_ON_LOAN` (immediate checkout)
    ///
    /// The creation half of the `checkout` trigger, for the walk-up case
    /// with no prior request. Item resolution, availability guards and the
    /// loan-period pre-action are identical to `(PENDING, checkout)`.
    /// Emits no event.
    ///
    /// # Errors
    /// Same as the checkout transition, plus `Persistence` when the pid
    /// already exists.
    pub fn checkout_new(
        &mut self,
        loan_pid: &str,
        patron_pid: &str,
        document_pid: &str,
        actor: &ActorContext,
        params: TransitionParams,
    ) -> Result<Loan, CirculationError> {
        let mut loan = Loan::new(loan_pid, patron_pid, document_pid, LoanState::Pending);

        self.check_trigger_permitted(actor, &loan, Trigger::Checkout)?;

        let now = params.transaction_date.unwrap_or_else(Utc::now);
        self.prepare_checkout(&mut loan, &params, now)?;

        loan.state = LoanState::ItemOnLoan;
        self.store
            .create(&loan)
            .map_err(|e| map_store_error(loan_pid, e))?;
        debug!(loan = %loan.pid, item = ?loan.item_pid, "checkout created");

        if let Some(item) = &loan.item_pid {
            self.notify_availability(item, false);
        }
        Ok(loan)
    }

    /// Replace the item bound to an active loan
    ///
    /// Lives outside the state machine: the loan keeps its state and only
    /// the binding changes. Used when the borrowed copy is lost or damaged
    /// and the library substitutes another copy of the same document.
    ///
    /// # Errors
    /// * `ItemReplaceDenied` - Loan not active, replacement cannot
    ///   circulate, or replacement held by another active loan
    /// * `LoanNotFound` / `Persistence` - Storage failures
    pub fn replace_item(
        &mut self,
        loan_pid: &str,
        item_pid: &str,
    ) -> Result<Loan, CirculationError> {
        let (mut loan, version) = self
            .store
            .load(loan_pid)
            .map_err(|e| map_store_error(loan_pid, e))?;

        if !loan.state.is_active() {
            return Err(CirculationError::item_replace_denied(
                loan_pid,
                &format!("loan is in state '{}'", loan.state),
            ));
        }

        let circulates = self
            .policy
            .item_can_circulate(item_pid)
            .map_err(|e| map_policy_error(loan_pid, e))?;
        if !circulates {
            return Err(CirculationError::item_replace_denied(
                loan_pid,
                &format!("item '{}' cannot circulate", item_pid),
            ));
        }

        if let Some(holder) = self
            .store
            .active_loan_for_item(item_pid)
            .map_err(|e| map_store_error(loan_pid, e))?
        {
            if holder.pid != loan.pid {
                return Err(CirculationError::item_replace_denied(
                    loan_pid,
                    &format!("item '{}' is held by loan '{}'", item_pid, holder.pid),
                ));
            }
        }

        let previous = loan.item_pid.replace(item_pid.to_string());
        self.store
            .save(&loan, version)
            .map_err(|e| map_store_error(loan_pid, e))?;
        debug!(loan = %loan.pid, from = ?previous, to = %item_pid, "item replaced");

        if let Some(old) = &previous {
            self.notify_availability(old, true);
        }
        self.notify_availability(item_pid, false);
        Ok(loan)
    }

    fn check_trigger_permitted(
        &self,
        actor: &ActorContext,
        loan: &Loan,
        trigger: Trigger,
    ) -> Result<(), CirculationError> {
        let permitted = self
            .policy
            .is_trigger_permitted(actor, loan, trigger)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        if !permitted {
            return Err(CirculationError::rejected(
                &loan.pid,
                trigger,
                RejectReason::TriggerNotPermitted,
            ));
        }
        Ok(())
    }

    /// Resolve the item for a checkout, then set the loan period
    fn prepare_checkout(
        &mut self,
        loan: &mut Loan,
        params: &TransitionParams,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        if let Some(requested) = &params.item_pid {
            match &loan.item_pid {
                Some(bound) if bound != requested => {
                    return Err(CirculationError::rejected(
                        &loan.pid,
                        Trigger::Checkout,
                        RejectReason::ItemMismatch,
                    ));
                }
                _ => loan.item_pid = Some(requested.clone()),
            }
        }

        if loan.item_pid.is_none() {
            let auto = self
                .policy
                .should_auto_assign_item(loan)
                .map_err(|e| map_policy_error(&loan.pid, e))?;
            if !auto {
                return Err(CirculationError::rejected(
                    &loan.pid,
                    Trigger::Checkout,
                    RejectReason::ItemNotBound,
                ));
            }
            loan.item_pid = self
                .policy
                .available_item_for_document(&loan.document_pid)
                .map_err(|e| map_policy_error(&loan.pid, e))?;
        }

        let item = loan.item_pid.clone().ok_or_else(|| {
            CirculationError::no_available_item(&loan.pid, &loan.document_pid)
        })?;

        self.check_item_usable(loan, &item, Trigger::Checkout)?;
        self.set_loan_period(loan, now, Trigger::Checkout)
    }

    /// Validate a request: the item must be bound and usable
    fn prepare_validate(
        &mut self,
        loan: &mut Loan,
        params: &TransitionParams,
    ) -> Result<(), CirculationError> {
        if let Some(requested) = &params.item_pid {
            match &loan.item_pid {
                Some(bound) if bound != requested => {
                    return Err(CirculationError::rejected(
                        &loan.pid,
                        Trigger::Validate,
                        RejectReason::ItemMismatch,
                    ));
                }
                _ => loan.item_pid = Some(requested.clone()),
            }
        }

        let item = match loan.item_pid.clone() {
            Some(item) => item,
            None => {
                return Err(CirculationError::rejected(
                    &loan.pid,
                    Trigger::Validate,
                    RejectReason::ItemNotBound,
                ));
            }
        };

        self.check_item_usable(loan, &item, Trigger::Validate)?;

        // The pickup location defaults to the item's home location.
        let has_pickup = loan
            .delivery
            .as_ref()
            .and_then(|d| d.pickup_location_pid.as_ref())
            .is_some();
        if !has_pickup {
            let home = self
                .policy
                .item_location(&item)
                .map_err(|e| map_policy_error(&loan.pid, e))?;
            if let Some(home) = home {
                loan.delivery
                    .get_or_insert_with(Default::default)
                    .pickup_location_pid = Some(home);
            }
        }
        Ok(())
    }

    /// Handover to the patron: the loan period starts now
    fn prepare_deliver(
        &mut self,
        loan: &mut Loan,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        if loan.item_pid.is_none() {
            return Err(CirculationError::rejected(
                &loan.pid,
                Trigger::Deliver,
                RejectReason::ItemNotBound,
            ));
        }
        self.set_loan_period(loan, now, Trigger::Deliver)
    }

    /// Push the end date out by the extension duration
    fn prepare_extend(
        &mut self,
        loan: &mut Loan,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        let allowed = self
            .policy
            .can_extend(loan)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        if !allowed {
            return Err(CirculationError::rejected(
                &loan.pid,
                Trigger::Extend,
                RejectReason::ExtensionDenied,
            ));
        }

        let days = self
            .policy
            .extension_duration(loan)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        // Extensions run from the current end date, not from today.
        let base = loan.end_date.unwrap_or_else(|| now.date_naive());
        loan.end_date = Some(base + Duration::days(days));
        loan.extension_count += 1;

        self.check_duration_valid(loan, Trigger::Extend)
    }

    /// Close the loan period and record the actual return
    fn prepare_checkin(
        &mut self,
        loan: &mut Loan,
        params: &TransitionParams,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        let bound = match &loan.item_pid {
            Some(bound) => bound.clone(),
            None => {
                return Err(CirculationError::rejected(
                    &loan.pid,
                    Trigger::Checkin,
                    RejectReason::ItemNotBound,
                ));
            }
        };
        if let Some(requested) = &params.item_pid {
            if *requested != bound {
                return Err(CirculationError::rejected(
                    &loan.pid,
                    Trigger::Checkin,
                    RejectReason::ItemMismatch,
                ));
            }
        }

        // Immutable once set.
        if loan.actual_return_date.is_none() {
            loan.actual_return_date = Some(now);
        }
        loan.end_date = Some(now.date_naive());
        Ok(())
    }

    /// Item must circulate and not be held by another active loan
    fn check_item_usable(
        &self,
        loan: &Loan,
        item_pid: &str,
        trigger: Trigger,
    ) -> Result<(), CirculationError> {
        let circulates = self
            .policy
            .item_can_circulate(item_pid)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        if !circulates {
            return Err(CirculationError::item_not_available(
                &loan.pid, item_pid, trigger,
            ));
        }

        if let Some(holder) = self
            .store
            .active_loan_for_item(item_pid)
            .map_err(|e| map_store_error(&loan.pid, e))?
        {
            if holder.pid != loan.pid {
                return Err(CirculationError::item_not_available(
                    &loan.pid, item_pid, trigger,
                ));
            }
        }
        Ok(())
    }

    fn set_loan_period(
        &self,
        loan: &mut Loan,
        now: DateTime<Utc>,
        trigger: Trigger,
    ) -> Result<(), CirculationError> {
        let days = self
            .policy
            .loan_duration(loan)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        let start = now.date_naive();
        loan.start_date = Some(start);
        loan.end_date = Some(start + Duration::days(days));
        self.check_duration_valid(loan, trigger)
    }

    fn check_duration_valid(&self, loan: &Loan, trigger: Trigger) -> Result<(), CirculationError> {
        let valid = self
            .policy
            .is_loan_duration_valid(loan)
            .map_err(|e| map_policy_error(&loan.pid, e))?;
        if !valid {
            return Err(CirculationError::rejected(
                &loan.pid,
                trigger,
                RejectReason::InvalidLoanDuration,
            ));
        }
        Ok(())
    }

    /// Availability side effects, after the commit
    ///
    /// The transition is already durable; a failing callback is logged and
    /// swallowed.
    fn run_post_actions(&mut self, loan: &Loan, src: LoanState, trigger: Trigger) {
        let item = match &loan.item_pid {
            Some(item) => item,
            None => return,
        };
        match (src, trigger) {
            // Item leaves the shelf.
            (LoanState::Pending, Trigger::Checkout)
            | (LoanState::Pending, Trigger::Validate)
            | (LoanState::ItemInTransitForPickup, Trigger::Deliver) => {
                self.notify_availability(item, false);
            }
            // Item comes back and goes to the next pending request, if any.
            (LoanState::ItemOnLoan, Trigger::Checkin)
            | (LoanState::ItemInTransitToHouse, Trigger::Receive)
            | (LoanState::ItemInTransitForPickup, Trigger::Cancel) => {
                self.notify_availability(item, true);
                self.offer_item_to_pending_request(item, &loan.document_pid);
            }
            _ => {}
        }
    }

    /// Bind a freed item to the pending request the policy selects
    ///
    /// Post-commit and best-effort like the availability callback: any
    /// failure is logged and the item simply stays on the shelf. The
    /// selected loan stays `PENDING`; only its item binding changes.
    fn offer_item_to_pending_request(&mut self, item_pid: &str, document_pid: &str) {
        let pending = match self.store.pending_loans_for_document(document_pid) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(document = %document_pid, error = %e, "pending request lookup failed");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        let chosen = match self.policy.select_pending_request(item_pid, &pending) {
            Ok(Some(pid)) => pid,
            Ok(None) => return,
            Err(e) => {
                warn!(item = %item_pid, error = %e, "pending request selection failed");
                return;
            }
        };

        let (mut target, version) = match self.store.load(&chosen) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(loan = %chosen, error = %e, "pending request load failed");
                return;
            }
        };
        target.item_pid = Some(item_pid.to_string());
        match self.store.save(&target, version) {
            Ok(_) => {
                debug!(loan = %chosen, item = %item_pid, "freed item bound to pending request")
            }
            Err(e) => warn!(loan = %chosen, error = %e, "pending request save failed"),
        }
    }

    fn notify_availability(&self, item_pid: &str, available: bool) {
        if let Err(e) = self.policy.item_availability_changed(item_pid, available) {
            warn!(item = %item_pid, error = %e, "availability callback failed");
        }
    }

    /// Publish the transition event, best effort
    fn emit(&self, loan: &Loan, src: LoanState, trigger: Trigger, timestamp: DateTime<Utc>) {
        let event = TransitionEvent {
            loan_pid: loan.pid.clone(),
            previous_state: src,
            trigger,
            new_state: loan.state,
            timestamp,
        };
        if let Err(e) = self.sink.publish(&event) {
            warn!(loan = %loan.pid, error = %e, "event publication failed");
        }
    }
}

fn map_store_error(loan_pid: &str, err: StoreError) -> CirculationError {
    match err {
        StoreError::NotFound { loan_pid } => CirculationError::LoanNotFound { loan_pid },
        StoreError::MultipleActiveLoans { item_pid } => {
            CirculationError::MultipleLoansOnItem { item_pid }
        }
        StoreError::Conflict { .. } => {
            CirculationError::persistence(loan_pid, &err.to_string(), true)
        }
        StoreError::AlreadyExists { .. } | StoreError::Backend { .. } => {
            CirculationError::persistence(loan_pid, &err.to_string(), false)
        }
    }
}

fn map_policy_error(loan_pid: &str, err: PolicyError) -> CirculationError {
    let capability = err.capability().to_string();
    let message = match &err {
        PolicyError::Unconfigured { .. } => "not configured".to_string(),
        PolicyError::Failed { message, .. } => message.clone(),
    };
    CirculationError::policy_evaluation(loan_pid, &capability, &message)
}
