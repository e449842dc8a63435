use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, ProfileResponse, ProfileSource, RegisterRequest, UpdatePasswordRequest},
        cart::{AddToCartRequest, CartItemDto, CartList},
        catalog::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
        orders::{OrderList, OrderWithItems, RevisionRequestBody, RevisionResponse},
        uploads::{UploadBatchResponse, UploadQuery, UploadResultDto},
        workflow::{AssignEditorRequest, EditedImageResponse, QueueItemDto, QueueList},
    },
    models::{
        CartItem, ItemSpecifications, Order, OrderItem, PhotoRef, Profile, Revision,
        RevisionImage, Role, Service, UploadedImage,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, health, orders, params, uploads, workflow},
    workflow::OrderStatus,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_password,
        catalog::list_services,
        catalog::get_service,
        catalog::create_service,
        catalog::update_service,
        catalog::delete_service,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::request_revision,
        workflow::editor_queue,
        workflow::upload_edited_image,
        uploads::upload_batch,
        admin::list_users,
        admin::create_user,
        admin::update_user,
        admin::deactivate_user,
        admin::list_editors,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::assign_editor,
        admin::cancel_order,
        admin::delete_order,
        admin::assign_item_editor,
        admin::list_access_policies,
        admin::toggle_access_policy
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            Profile,
            Service,
            PhotoRef,
            ItemSpecifications,
            CartItem,
            Order,
            OrderItem,
            UploadedImage,
            Revision,
            RevisionImage,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdatePasswordRequest,
            ProfileSource,
            ProfileResponse,
            CreateServiceRequest,
            UpdateServiceRequest,
            ServiceList,
            AddToCartRequest,
            CartItemDto,
            CartList,
            OrderList,
            OrderWithItems,
            RevisionRequestBody,
            RevisionResponse,
            UploadQuery,
            UploadResultDto,
            UploadBatchResponse,
            AssignEditorRequest,
            QueueItemDto,
            QueueList,
            EditedImageResponse,
            admin::UserListQuery,
            admin::CreateUserRequest,
            admin::UpdateUserRequest,
            admin::UserList,
            admin::EditorDto,
            admin::EditorList,
            admin::AdminOrderDto,
            admin::AdminOrderList,
            admin::UpdateOrderStatusRequest,
            admin::AccessPolicyDto,
            admin::AccessPolicyList,
            admin::ToggleAccessPolicyRequest,
            params::Pagination,
            params::ServiceQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Service>,
            ApiResponse<ServiceList>,
            ApiResponse<CartList>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<QueueList>,
            ApiResponse<UploadBatchResponse>,
            ApiResponse<admin::AdminOrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication and session context"),
        (name = "Services", description = "Editing service catalog"),
        (name = "Cart", description = "Per-photo cart rows"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Workflow", description = "Editor queue and deliveries"),
        (name = "Uploads", description = "Photo upload pipeline"),
        (name = "Admin", description = "Management surfaces"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
