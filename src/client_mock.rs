use async_trait::async_trait;
use mockall::mock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::{
    ConferencingProvider, ProviderMeeting, ProviderMeetingRequest, ProviderRegistrant,
    ProviderRegistrantRequest,
};
use crate::errors::ServiceError;

// Mockall mock of the provider trait for expectation-style tests
mock! {
    pub Provider {}

    #[async_trait]
    impl ConferencingProvider for Provider {
        async fn create_meeting(
            &self,
            request: &ProviderMeetingRequest,
        ) -> Result<ProviderMeeting, ServiceError>;

        async fn update_meeting(
            &self,
            provider_meeting_id: &str,
            request: &ProviderMeetingRequest,
        ) -> Result<(), ServiceError>;

        async fn delete_meeting(&self, provider_meeting_id: &str) -> Result<(), ServiceError>;

        async fn create_registrant(
            &self,
            provider_meeting_id: &str,
            request: &ProviderRegistrantRequest,
        ) -> Result<ProviderRegistrant, ServiceError>;

        async fn update_registrant(
            &self,
            provider_meeting_id: &str,
            provider_registrant_id: &str,
            request: &ProviderRegistrantRequest,
        ) -> Result<(), ServiceError>;

        async fn delete_registrant(
            &self,
            provider_meeting_id: &str,
            provider_registrant_id: &str,
        ) -> Result<(), ServiceError>;

        async fn get_join_link(&self, provider_meeting_id: &str) -> Result<String, ServiceError>;
    }
}

// A simple in-memory store backing a stateful fake provider
pub struct MockProviderStore {
    meetings: Mutex<HashMap<String, ProviderMeeting>>,
    registrants: Mutex<HashMap<String, Vec<ProviderRegistrant>>>, // meeting id -> registrants
    next_id: Mutex<u64>,
}

impl MockProviderStore {
    pub fn new() -> Self {
        Self {
            meetings: Mutex::new(HashMap::new()),
            registrants: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    pub fn meeting_count(&self) -> usize {
        self.meetings.lock().unwrap().len()
    }

    pub fn registrant_count(&self, provider_meeting_id: &str) -> usize {
        self.registrants
            .lock()
            .unwrap()
            .get(provider_meeting_id)
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

impl Default for MockProviderStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful fake provider used by service and handler tests. Behaves
/// like a well-behaved provider: every scheduling call succeeds and is
/// visible through the shared store.
pub struct FakeProvider {
    store: Arc<MockProviderStore>,
}

impl FakeProvider {
    pub fn new() -> (Self, Arc<MockProviderStore>) {
        let store = Arc::new(MockProviderStore::new());
        (
            Self {
                store: Arc::clone(&store),
            },
            store,
        )
    }
}

#[async_trait]
impl ConferencingProvider for FakeProvider {
    async fn create_meeting(
        &self,
        _request: &ProviderMeetingRequest,
    ) -> Result<ProviderMeeting, ServiceError> {
        let id = format!("pm_{}", self.store.next_id());
        let meeting = ProviderMeeting {
            provider_meeting_id: id.clone(),
            join_url: format!("https://conferencing.example.com/j/{}", id),
        };
        self.store
            .meetings
            .lock()
            .unwrap()
            .insert(id, meeting.clone());
        Ok(meeting)
    }

    async fn update_meeting(
        &self,
        provider_meeting_id: &str,
        _request: &ProviderMeetingRequest,
    ) -> Result<(), ServiceError> {
        if !self
            .store
            .meetings
            .lock()
            .unwrap()
            .contains_key(provider_meeting_id)
        {
            return Err(ServiceError::Transient(format!(
                "provider meeting {} not found",
                provider_meeting_id
            )));
        }
        Ok(())
    }

    async fn delete_meeting(&self, provider_meeting_id: &str) -> Result<(), ServiceError> {
        self.store.meetings.lock().unwrap().remove(provider_meeting_id);
        Ok(())
    }

    async fn create_registrant(
        &self,
        provider_meeting_id: &str,
        _request: &ProviderRegistrantRequest,
    ) -> Result<ProviderRegistrant, ServiceError> {
        let id = format!("pr_{}", self.store.next_id());
        let registrant = ProviderRegistrant {
            provider_registrant_id: id,
            join_url: format!(
                "https://conferencing.example.com/j/{}?tk=abc",
                provider_meeting_id
            ),
        };
        self.store
            .registrants
            .lock()
            .unwrap()
            .entry(provider_meeting_id.to_string())
            .or_default()
            .push(registrant.clone());
        Ok(registrant)
    }

    async fn update_registrant(
        &self,
        _provider_meeting_id: &str,
        _provider_registrant_id: &str,
        _request: &ProviderRegistrantRequest,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn delete_registrant(
        &self,
        provider_meeting_id: &str,
        provider_registrant_id: &str,
    ) -> Result<(), ServiceError> {
        if let Some(registrants) = self
            .store
            .registrants
            .lock()
            .unwrap()
            .get_mut(provider_meeting_id)
        {
            registrants.retain(|r| r.provider_registrant_id != provider_registrant_id);
        }
        Ok(())
    }

    async fn get_join_link(&self, provider_meeting_id: &str) -> Result<String, ServiceError> {
        self.store
            .meetings
            .lock()
            .unwrap()
            .get(provider_meeting_id)
            .map(|m| m.join_url.clone())
            .ok_or_else(|| {
                ServiceError::Transient(format!(
                    "provider meeting {} not found",
                    provider_meeting_id
                ))
            })
    }
}
