//! Fixtures shared by the service tests.

use fake::faker::company::en::CompanyName;
use fake::Fake;
use uuid::Uuid;

use super::{InMemoryLoyaltyStore, LoyaltyService, LoyaltySettings};
use crate::models::loyalty_code::{GenerateLoyaltyCodeRequest, RedeemCodeRequest};
use crate::models::reward::CreateRewardRequest;
use crate::models::{AuthContext, LoyaltyCode, Restaurant, Reward, Role};

pub(crate) struct Fixture {
    pub service: LoyaltyService<InMemoryLoyaltyStore>,
    pub store: InMemoryLoyaltyStore,
    pub admin: AuthContext,
    pub owner: AuthContext,
    pub restaurant: Restaurant,
}

pub(crate) async fn fixture() -> Fixture {
    fixture_with(LoyaltySettings::default()).await
}

pub(crate) async fn fixture_with(settings: LoyaltySettings) -> Fixture {
    let store = InMemoryLoyaltyStore::new();
    let owner = AuthContext::new(Uuid::new_v4(), Role::Owner);
    let name: String = CompanyName().fake();
    let restaurant = store.add_restaurant(&name, owner.user_id).await;

    Fixture {
        service: LoyaltyService::new(store.clone(), settings),
        store,
        admin: AuthContext::new(Uuid::new_v4(), Role::Admin),
        owner,
        restaurant,
    }
}

pub(crate) fn customer() -> AuthContext {
    AuthContext::new(Uuid::new_v4(), Role::Customer)
}

pub(crate) fn generate_request(point_value: i64) -> GenerateLoyaltyCodeRequest {
    GenerateLoyaltyCodeRequest {
        point_value,
        description: None,
        max_uses: None,
        expiry_date: None,
        restaurant_id: None,
    }
}

pub(crate) fn redeem_request(code: &str) -> RedeemCodeRequest {
    RedeemCodeRequest {
        code: code.to_string(),
        restaurant_id: None,
    }
}

pub(crate) fn reward_request(restaurant_id: Uuid, points_required: i64) -> CreateRewardRequest {
    CreateRewardRequest {
        restaurant_id,
        name: "Free Drink".to_string(),
        description: None,
        points_required,
        discount_amount_cents: None,
        discount_percentage: None,
        is_active: true,
        start_date: None,
        end_date: None,
        max_redemptions: None,
    }
}

impl Fixture {
    /// Mints a code for the fixture restaurant (or globally).
    pub async fn mint(
        &self,
        point_value: i64,
        max_uses: Option<i32>,
        restaurant_id: Option<Uuid>,
    ) -> LoyaltyCode {
        let mut request = generate_request(point_value);
        request.max_uses = max_uses;
        request.restaurant_id = restaurant_id;
        self.service
            .generate_code(&self.admin, request)
            .await
            .expect("mint code")
    }

    /// Credits `points` to the customer's bucket by redeeming a fresh code.
    pub async fn credit(&self, customer: &AuthContext, restaurant_id: Option<Uuid>, points: i64) {
        let code = self.mint(points, Some(1), restaurant_id).await;
        self.service
            .redeem_code(customer, redeem_request(&code.code))
            .await
            .expect("credit points");
    }

    pub async fn create_reward(&self, points_required: i64, max_redemptions: Option<i32>) -> Reward {
        let mut request = reward_request(self.restaurant.id, points_required);
        request.max_redemptions = max_redemptions;
        self.service
            .create_reward(&self.owner, request)
            .await
            .expect("create reward")
    }

    pub async fn available(&self, customer: &AuthContext, restaurant_id: Option<Uuid>) -> i64 {
        self.service
            .get_balance(customer)
            .await
            .expect("balance")
            .into_iter()
            .find(|b| b.restaurant_id == restaurant_id)
            .map(|b| b.available_points)
            .unwrap_or(0)
    }
}
