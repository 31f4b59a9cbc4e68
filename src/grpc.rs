use std::future::Future;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tonic::service::interceptor::InterceptedService;
use tonic::{transport::Server, Request, Response, Status};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{caller_identity, identity_interceptor};
use crate::entities::product::Model as ProductModel;
use crate::errors::grpc::map_service_error;
use crate::proto::product::{
    product_service_server::{ProductService, ProductServiceServer},
    AddProductRequest, AddProductResponse, DeleteProductRequest, DeleteProductResponse,
    EditProductRequest, EditProductResponse, GetProductRequest, GetProductResponse,
    GetProductsRequest, GetProductsResponse, Product, ReduceStockRequest, ReduceStockResponse,
    ViewProductsRequest, ViewProductsResponse,
};
use crate::services::{self, ProductInput, StockReductionLine};

/// Converts a stored product to its wire form. Price is narrowed to `f32`.
pub fn to_wire_product(model: ProductModel) -> Product {
    Product {
        id: model.id.to_string(),
        product_name: model.product_name,
        description: model.description,
        image_url: model.image_url,
        price: model.price as f32,
        stock: model.stock,
        category_name: model.category_name,
    }
}

impl From<AddProductRequest> for ProductInput {
    fn from(req: AddProductRequest) -> Self {
        Self {
            product_name: req.product_name,
            description: req.description,
            image_url: req.image_url,
            price: f64::from(req.price),
            stock: req.stock,
            category_name: req.category_name,
        }
    }
}

impl From<EditProductRequest> for ProductInput {
    fn from(req: EditProductRequest) -> Self {
        Self {
            product_name: req.product_name,
            description: req.description,
            image_url: req.image_url,
            price: f64::from(req.price),
            stock: req.stock,
            category_name: req.category_name,
        }
    }
}

pub struct ProductGrpcService {
    pub svc: services::ProductService,
}

impl ProductGrpcService {
    pub fn new(svc: services::ProductService) -> Self {
        Self { svc }
    }

    async fn live_products(&self) -> Result<Vec<Product>, Status> {
        let products = map_service_error(self.svc.list_products().await)?;
        Ok(products.into_iter().map(to_wire_product).collect())
    }
}

#[tonic::async_trait]
impl ProductService for ProductGrpcService {
    async fn get_products(
        &self,
        _request: Request<GetProductsRequest>,
    ) -> Result<Response<GetProductsResponse>, Status> {
        let products = self.live_products().await?;
        Ok(Response::new(GetProductsResponse { products }))
    }

    async fn add_product(
        &self,
        request: Request<AddProductRequest>,
    ) -> Result<Response<AddProductResponse>, Status> {
        let caller = caller_identity(&request);
        let req = request.into_inner();

        map_service_error(self.svc.add_product(&caller, req.into()).await)?;

        Ok(Response::new(AddProductResponse {
            status: true,
            message: "Product added successfully".to_string(),
        }))
    }

    async fn edit_product(
        &self,
        request: Request<EditProductRequest>,
    ) -> Result<Response<EditProductResponse>, Status> {
        let caller = caller_identity(&request);
        let mut req = request.into_inner();
        let id = std::mem::take(&mut req.id);

        map_service_error(self.svc.edit_product(&caller, &id, req.into()).await)?;

        Ok(Response::new(EditProductResponse {
            status: true,
            message: "Product updated successfully".to_string(),
        }))
    }

    async fn delete_product(
        &self,
        request: Request<DeleteProductRequest>,
    ) -> Result<Response<DeleteProductResponse>, Status> {
        let caller = caller_identity(&request);
        let req = request.into_inner();

        map_service_error(self.svc.delete_product(&caller, &req.id).await)?;

        Ok(Response::new(DeleteProductResponse {
            status: true,
            message: "Product deleted successfully".to_string(),
        }))
    }

    async fn view_products(
        &self,
        _request: Request<ViewProductsRequest>,
    ) -> Result<Response<ViewProductsResponse>, Status> {
        let products = self.live_products().await?;
        Ok(Response::new(ViewProductsResponse { products }))
    }

    async fn get_product(
        &self,
        request: Request<GetProductRequest>,
    ) -> Result<Response<GetProductResponse>, Status> {
        let req = request.into_inner();
        let product = map_service_error(self.svc.get_product(&req.id).await)?;

        Ok(Response::new(GetProductResponse {
            product: Some(to_wire_product(product)),
        }))
    }

    async fn reduce_stock(
        &self,
        request: Request<ReduceStockRequest>,
    ) -> Result<Response<ReduceStockResponse>, Status> {
        let lines = request
            .into_inner()
            .items
            .into_iter()
            .map(|item| StockReductionLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        map_service_error(self.svc.reduce_stock(lines).await)?;

        Ok(Response::new(ReduceStockResponse {
            message: "Stock reduced successfully".to_string(),
        }))
    }
}

pub type IdentityInterceptor = fn(Request<()>) -> Result<Request<()>, Status>;

/// Wraps the service in its tonic server with gzip and the identity interceptor.
pub fn product_server(
    svc: ProductGrpcService,
) -> InterceptedService<ProductServiceServer<ProductGrpcService>, IdentityInterceptor> {
    let server = ProductServiceServer::new(svc)
        .accept_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Gzip);

    InterceptedService::new(server, identity_interceptor as IdentityInterceptor)
}

/// Serves the catalog on an already bound `listener` until `shutdown` resolves.
pub async fn serve<F>(
    svc: ProductGrpcService,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    F: Future<Output = ()> + Send,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Product catalog gRPC server listening on grpc://{}", addr);
    }

    Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(product_server(svc))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
}
