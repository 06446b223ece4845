pub mod rag_api_service;
