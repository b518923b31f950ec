use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::CarInput;
use crate::error::{AppError, AppResult};
use crate::hooks::{guard, Phase};
use crate::model::{Car, CarStatus};
use crate::store::Store;
use crate::validation::{validate_car, CarDraft, FieldErrors};

async fn require_car(store: &dyn Store, id: Uuid) -> AppResult<Car> {
    store
        .get_car(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Car {} not found", id)))
}

/// Live cars, narrowed to one status when `status` names one.
pub async fn list_cars(store: &dyn Store, status: Option<&str>) -> AppResult<Vec<Car>> {
    let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<CarStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                let mut errors = FieldErrors::default();
                errors.add("status", "The selected status is invalid.");
                return Err(errors.into());
            }
        },
        None => None,
    };
    Ok(store.list_cars(status).await?)
}

pub async fn get_car(store: &dyn Store, id: Uuid) -> AppResult<Car> {
    require_car(store, id).await
}

#[instrument(skip(store, input))]
pub async fn create_car(store: &dyn Store, input: &CarInput, actor: Option<Uuid>) -> AppResult<Car> {
    let car = guard(
        "car",
        Phase::Create,
        validate_car(store, input, None),
        |draft: CarDraft| async move { store.insert_car(&draft, actor).await },
    )
    .await?;
    info!(
        car_id = %car.id,
        brand = %car.brand,
        model = %car.model,
        serial_number = %car.serial_number,
        "car created"
    );
    Ok(car)
}

#[instrument(skip(store, input))]
pub async fn update_car(
    store: &dyn Store,
    id: Uuid,
    input: &CarInput,
    actor: Option<Uuid>,
) -> AppResult<Car> {
    let car = guard(
        "car",
        Phase::Update,
        async {
            require_car(store, id).await?;
            validate_car(store, input, Some(id)).await
        },
        |draft: CarDraft| async move { store.update_car(id, &draft, actor).await },
    )
    .await?;
    info!(
        car_id = %car.id,
        brand = %car.brand,
        model = %car.model,
        serial_number = %car.serial_number,
        "car updated"
    );
    Ok(car)
}

/// Soft delete; the deleting user is recorded before the car is hidden.
#[instrument(skip(store))]
pub async fn delete_car(store: &dyn Store, id: Uuid, actor: Option<Uuid>) -> AppResult<()> {
    guard(
        "car",
        Phase::Delete,
        require_car(store, id),
        |car: Car| async move {
            store.soft_delete_car(car.id, actor).await?;
            info!(
                car_id = %car.id,
                brand = %car.brand,
                model = %car.model,
                serial_number = %car.serial_number,
                "car deleted"
            );
            Ok(())
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoleType, UserStatus};
    use crate::store::memory::InMemoryStore;
    use crate::store::NewUser;
    use crate::validation::RoleDraft;

    fn input(serial: &str, status: &str) -> CarInput {
        CarInput {
            serial_number: Some(serial.into()),
            brand: Some("Toyota".into()),
            model: Some("Corolla".into()),
            year: Some(2015),
            price: Some(9_999.99),
            mileage: Some(120_000),
            seats: Some(5),
            doors: Some(4),
            status: Some(status.into()),
            engine: Some("Hybrid".into()),
            ..Default::default()
        }
    }

    async fn staff(store: &InMemoryStore) -> Uuid {
        let role = store
            .insert_role(&RoleDraft {
                name: RoleType::Admin,
                description: None,
            })
            .await
            .unwrap();
        store
            .insert_user(NewUser {
                name: "Staff".into(),
                email: "staff@example.com".into(),
                password_hash: "x".into(),
                phone: None,
                address: None,
                profile_image: None,
                status: UserStatus::Active,
                role_id: role.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn car_lifecycle_tracks_actor() {
        let store = InMemoryStore::new();
        let actor = staff(&store).await;

        let car = create_car(&store, &input("JT-1", "available"), Some(actor))
            .await
            .unwrap();
        assert_eq!(car.created_by, Some(actor));
        assert_eq!(car.updated_by, None);

        let car = update_car(&store, car.id, &input("JT-1", "sold"), Some(actor))
            .await
            .unwrap();
        assert_eq!(car.status, CarStatus::Sold);
        assert_eq!(car.updated_by, Some(actor));
        assert_eq!(car.created_by, Some(actor));

        delete_car(&store, car.id, Some(actor)).await.unwrap();
        assert!(matches!(
            get_car(&store, car.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(list_cars(&store, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_scopes_by_status() {
        let store = InMemoryStore::new();
        create_car(&store, &input("A-1", "available"), None).await.unwrap();
        create_car(&store, &input("A-2", "pending"), None).await.unwrap();
        create_car(&store, &input("A-3", "available"), None).await.unwrap();

        assert_eq!(list_cars(&store, None).await.unwrap().len(), 3);
        assert_eq!(list_cars(&store, Some("available")).await.unwrap().len(), 2);
        assert_eq!(list_cars(&store, Some("sold")).await.unwrap().len(), 0);
        let err = list_cars(&store, Some("scrapped")).await.unwrap_err();
        assert!(err.field_errors().unwrap().has("status"));
    }

    #[tokio::test]
    async fn invalid_year_writes_nothing() {
        let store = InMemoryStore::new();
        let bad = CarInput {
            year: Some(1885),
            ..input("OLD-1", "available")
        };
        let err = create_car(&store, &bad, None).await.unwrap_err();
        assert!(err.field_errors().unwrap().has("year"));
        assert!(store.list_cars(None).await.unwrap().is_empty());

        let ok = CarInput {
            year: Some(1887),
            ..input("OLD-2", "available")
        };
        assert!(create_car(&store, &ok, None).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_serial_rejected() {
        let store = InMemoryStore::new();
        create_car(&store, &input("DUP", "available"), None).await.unwrap();
        let err = create_car(&store, &input("DUP", "available"), None)
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().has("serial_number"));
    }
}
