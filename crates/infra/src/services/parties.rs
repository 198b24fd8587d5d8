use tracing::{info, instrument};

use stockroom_parties::{NewParty, Party, PartyEvent, PartyId, PartyKind};

use super::{Caller, ServiceResult, Services};
use crate::store::PartyStore;

const PARTY: &str = "parties.party";

impl Services {
    pub async fn create_customer(&self, caller: Caller, input: NewParty) -> ServiceResult<Party> {
        self.register_party(caller, PartyKind::Customer, input).await
    }

    pub async fn create_supplier(&self, caller: Caller, input: NewParty) -> ServiceResult<Party> {
        self.register_party(caller, PartyKind::Supplier, input).await
    }

    #[instrument(skip(self, input), fields(tenant_id = %caller.tenant_id, kind = kind.as_str()), err)]
    async fn register_party(
        &self,
        caller: Caller,
        kind: PartyKind,
        input: NewParty,
    ) -> ServiceResult<Party> {
        let now = self.now();
        let party = Party::register(caller.tenant_id, PartyId::generate(), kind, input, now)?;

        self.retry
            .run("insert_party", || self.store.insert_party(&party))
            .await?;

        info!(party_id = %party.id, "party registered");
        self.publish(
            caller.tenant_id,
            party.id.aggregate_id(),
            PARTY,
            &PartyEvent::PartyRegistered {
                tenant_id: caller.tenant_id,
                party_id: party.id,
                kind,
                name: party.name.clone(),
                occurred_at: now,
            },
        );
        Ok(party)
    }

    /// Suspended parties stay readable but cannot appear on new orders.
    #[instrument(skip(self), fields(tenant_id = %caller.tenant_id), err)]
    pub async fn suspend_party(&self, caller: Caller, id: PartyId) -> ServiceResult<Party> {
        let mut party = self.load_party(caller.tenant_id, id).await?;
        party.suspend()?;

        self.retry
            .run("update_party", || self.store.update_party(&party))
            .await?;

        self.publish(
            caller.tenant_id,
            party.id.aggregate_id(),
            PARTY,
            &PartyEvent::PartySuspended {
                tenant_id: caller.tenant_id,
                party_id: party.id,
                occurred_at: self.now(),
            },
        );
        Ok(party)
    }

    pub async fn get_party(&self, caller: Caller, id: PartyId) -> ServiceResult<Party> {
        self.load_party(caller.tenant_id, id).await
    }

    pub async fn list_parties(
        &self,
        caller: Caller,
        kind: Option<PartyKind>,
    ) -> ServiceResult<Vec<Party>> {
        Ok(self
            .retry
            .run("list_parties", || self.store.list_parties(caller.tenant_id, kind))
            .await?)
    }
}
